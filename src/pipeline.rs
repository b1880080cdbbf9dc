use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, path::Path, time::Instant};
use tracing::{error, info, warn};

use crate::{
    clean::{self, verify::verify_round_trip, CleanSummary},
    config::{DatasetPaths, Settings},
    storage::{self, ObjectStore},
};

pub const LIST_STEP: &str = "list_bucket";
pub const CLEAN_PRICES_STEP: &str = "clean_prices";
pub const UPLOAD_PRICES_STEP: &str = "upload_prices";
pub const CLEAN_INCIDENTS_STEP: &str = "clean_incidents";
pub const UPLOAD_INCIDENTS_STEP: &str = "upload_incidents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: String,
    pub status: StepStatus,
    pub detail: Option<String>,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CleanSummary>,
}

/// Outcome of every step in one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    fn push(
        &mut self,
        step: &str,
        status: StepStatus,
        detail: Option<String>,
        start: Option<Instant>,
        summary: Option<CleanSummary>,
    ) {
        self.steps.push(StepReport {
            step: step.to_string(),
            status,
            detail,
            elapsed_seconds: start.map_or(0.0, |s| s.elapsed().as_secs_f64()),
            summary,
        });
    }

    fn skip(&mut self, step: &str, reason: &str) {
        warn!(step, "skipped: {}", reason);
        self.push(step, StepStatus::Skipped, Some(reason.to_string()), None, None);
    }

    pub fn status_of(&self, step: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.status)
    }

    pub fn failures(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing run report")?;
        fs::write(path, json + "\n")
            .with_context(|| format!("writing run report {}", path.display()))
    }
}

/// Run the whole batch: list the bucket, then clean and upload each dataset.
///
/// A failing step is logged and recorded and the run moves on. `store` is
/// `None` when no bucket connection is available; bucket steps are then skipped.
pub async fn run<S: ObjectStore>(settings: &Settings, store: Option<&S>) -> RunReport {
    let mut report = RunReport::new();
    let target = store.zip(settings.bucket.as_deref());

    match target {
        Some((store, bucket)) => {
            let start = Instant::now();
            match storage::list_bucket_contents(store, bucket).await {
                Ok(objects) => report.push(
                    LIST_STEP,
                    StepStatus::Ok,
                    Some(format!("{} objects", objects.len())),
                    Some(start),
                    None,
                ),
                Err(e) => {
                    error!("An error occurred: {:#}", e);
                    report.push(LIST_STEP, StepStatus::Failed, Some(format!("{:#}", e)), Some(start), None);
                }
            }
        }
        None => report.skip(LIST_STEP, "no bucket connection"),
    }

    let cleaned = clean_step(&mut report, CLEAN_PRICES_STEP, &settings.prices, |p| {
        clean::clean_price_series(&p.input, &p.output)
    });
    upload_step(&mut report, UPLOAD_PRICES_STEP, target, &settings.prices, cleaned).await;

    let cleaned = clean_step(&mut report, CLEAN_INCIDENTS_STEP, &settings.incidents, |p| {
        clean::clean_incident_records(&p.input, &p.output, settings.max_missing_percent)
    });
    upload_step(&mut report, UPLOAD_INCIDENTS_STEP, target, &settings.incidents, cleaned).await;

    info!(failures = report.failures(), "run complete");
    report
}

/// Clean one dataset and confirm the written file kept every row.
fn clean_step<F>(report: &mut RunReport, step: &str, paths: &DatasetPaths, f: F) -> bool
where
    F: FnOnce(&DatasetPaths) -> Result<CleanSummary>,
{
    let start = Instant::now();
    let result = f(paths).and_then(|summary| {
        verify_round_trip(&summary.output, summary.rows_out)?;
        Ok(summary)
    });

    match result {
        Ok(summary) => {
            info!(
                step,
                rows_in = summary.rows_in,
                rows_out = summary.rows_out,
                "cleaned"
            );
            report.push(step, StepStatus::Ok, None, Some(start), Some(summary));
            true
        }
        Err(e) => {
            error!(
                "An error occurred while cleaning {}: {:#}",
                paths.input.display(),
                e
            );
            report.push(step, StepStatus::Failed, Some(format!("{:#}", e)), Some(start), None);
            false
        }
    }
}

async fn upload_step<S: ObjectStore>(
    report: &mut RunReport,
    step: &str,
    target: Option<(&S, &str)>,
    paths: &DatasetPaths,
    cleaned: bool,
) {
    if !cleaned {
        return report.skip(step, "cleaning failed");
    }
    let Some((store, bucket)) = target else {
        return report.skip(step, "no bucket connection");
    };

    let start = Instant::now();
    match storage::upload(store, bucket, &paths.output, &paths.object).await {
        Ok(bytes) => report.push(
            step,
            StepStatus::Ok,
            Some(format!("{} bytes to {}/{}", bytes, bucket, paths.object)),
            Some(start),
            None,
        ),
        Err(e) => {
            error!("An error occurred during upload: {:#}", e);
            report.push(step, StepStatus::Failed, Some(format!("{:#}", e)), Some(start), None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};
    use tracing_subscriber::{fmt, EnvFilter};

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    const PRICES: &str = "Date,Price,Open,High,Low,Vol.,Change %\n\
        01/03/2024,\"4,704.81\",\"4,725.07\",\"4,729.29\",\"4,699.71\",,-0.80%\n\
        01/02/2024,\"4,742.83\",\"4,745.20\",\"4,754.33\",\"4,722.67\",,-0.57%\n";

    const INCIDENTS: &str = "eventid,iyear,imonth,iday,city,summary\n\
        1,1970,7,2,Santo Domingo,\n\
        2,1970,1,1,Madison,bombing\n\
        3,1970,1,0,Unknown,\n";

    fn settings(dir: &TempDir, bucket: Option<&str>) -> Settings {
        let p = |name: &str| -> PathBuf { dir.path().join(name) };
        Settings {
            bucket: bucket.map(str::to_string),
            credentials: None,
            prices: DatasetPaths {
                input: p("sp500.csv"),
                output: p("sp500_cleaned.csv"),
                object: "cleaned_data/sp500_cleaned.csv".into(),
            },
            incidents: DatasetPaths {
                input: p("terrorism.csv"),
                output: p("terrorism_cleaned.csv"),
                object: "cleaned_data/terrorism_cleaned.csv".into(),
            },
            max_missing_percent: 50.0,
            report: None,
        }
    }

    fn write_inputs(dir: &TempDir) {
        fs::write(dir.path().join("sp500.csv"), PRICES).unwrap();
        fs::write(dir.path().join("terrorism.csv"), INCIDENTS).unwrap();
    }

    #[tokio::test]
    async fn full_run_cleans_and_uploads_both() {
        init_logging();
        let dir = tempdir().unwrap();
        write_inputs(&dir);
        let store = MemoryStore::with_bucket("etl");

        let report = run(&settings(&dir, Some("etl")), Some(&store)).await;

        assert_eq!(report.failures(), 0);
        for step in [
            LIST_STEP,
            CLEAN_PRICES_STEP,
            UPLOAD_PRICES_STEP,
            CLEAN_INCIDENTS_STEP,
            UPLOAD_INCIDENTS_STEP,
        ] {
            assert_eq!(report.status_of(step), Some(StepStatus::Ok), "{step}");
        }

        let uploaded = store.object("etl", "cleaned_data/sp500_cleaned.csv").unwrap();
        let local = fs::read(dir.path().join("sp500_cleaned.csv")).unwrap();
        assert_eq!(uploaded, local);

        let incidents = String::from_utf8(
            store
                .object("etl", "cleaned_data/terrorism_cleaned.csv")
                .unwrap(),
        )
        .unwrap();
        // summary is 2/3 missing and goes; the iday 0 row goes
        assert_eq!(incidents.lines().next(), Some("eventid,city,Date"));
        assert_eq!(incidents.lines().count(), 3);
    }

    #[tokio::test]
    async fn failed_clean_skips_its_upload_only() {
        init_logging();
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("terrorism.csv"), INCIDENTS).unwrap();
        let store = MemoryStore::with_bucket("etl");

        let report = run(&settings(&dir, Some("etl")), Some(&store)).await;

        assert_eq!(report.status_of(CLEAN_PRICES_STEP), Some(StepStatus::Failed));
        assert_eq!(report.status_of(UPLOAD_PRICES_STEP), Some(StepStatus::Skipped));
        assert_eq!(report.status_of(CLEAN_INCIDENTS_STEP), Some(StepStatus::Ok));
        assert_eq!(report.status_of(UPLOAD_INCIDENTS_STEP), Some(StepStatus::Ok));
        assert!(store.object("etl", "cleaned_data/sp500_cleaned.csv").is_none());
    }

    #[tokio::test]
    async fn no_store_cleans_locally() {
        init_logging();
        let dir = tempdir().unwrap();
        write_inputs(&dir);

        let report = run::<MemoryStore>(&settings(&dir, None), None).await;

        assert_eq!(report.failures(), 0);
        assert_eq!(report.status_of(LIST_STEP), Some(StepStatus::Skipped));
        assert_eq!(report.status_of(UPLOAD_PRICES_STEP), Some(StepStatus::Skipped));
        assert_eq!(report.status_of(CLEAN_PRICES_STEP), Some(StepStatus::Ok));
        assert!(dir.path().join("terrorism_cleaned.csv").exists());
    }

    #[tokio::test]
    async fn bucket_errors_do_not_stop_the_run() {
        init_logging();
        let dir = tempdir().unwrap();
        write_inputs(&dir);
        let store = MemoryStore::with_bucket("other");

        let report = run(&settings(&dir, Some("etl")), Some(&store)).await;

        assert_eq!(report.status_of(LIST_STEP), Some(StepStatus::Failed));
        assert_eq!(report.status_of(CLEAN_PRICES_STEP), Some(StepStatus::Ok));
        assert_eq!(report.status_of(UPLOAD_PRICES_STEP), Some(StepStatus::Failed));
        assert_eq!(report.status_of(CLEAN_INCIDENTS_STEP), Some(StepStatus::Ok));
        assert_eq!(report.status_of(UPLOAD_INCIDENTS_STEP), Some(StepStatus::Failed));
        assert_eq!(report.failures(), 3);
    }

    #[tokio::test]
    async fn report_serializes_statuses() -> Result<()> {
        let dir = tempdir()?;
        write_inputs(&dir);

        let report = run::<MemoryStore>(&settings(&dir, None), None).await;
        let path = dir.path().join("report.json");
        report.write_json(&path)?;

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        let steps = json["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 5);
        assert_eq!(steps[0]["status"], "skipped");
        assert_eq!(steps[1]["status"], "ok");
        assert_eq!(steps[1]["summary"]["rows_out"], 2);
        Ok(())
    }
}
