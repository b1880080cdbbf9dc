use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

/// Command-line args; every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "bucketclean", about = "Clean two CSV datasets and publish them to a bucket")]
pub struct Args {
    /// Bucket to list and upload into
    #[arg(long, env = "ETL_BUCKET")]
    pub bucket: Option<String>,

    /// Service account key file, exported as GOOGLE_APPLICATION_CREDENTIALS
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    #[arg(long, env = "ETL_PRICES_INPUT", default_value = "sp500.csv")]
    pub prices_input: PathBuf,

    #[arg(long, env = "ETL_PRICES_OUTPUT", default_value = "sp500_cleaned.csv")]
    pub prices_output: PathBuf,

    #[arg(
        long,
        env = "ETL_PRICES_OBJECT",
        default_value = "cleaned_data/sp500_cleaned.csv"
    )]
    pub prices_object: String,

    #[arg(long, env = "ETL_INCIDENTS_INPUT", default_value = "terrorism.csv")]
    pub incidents_input: PathBuf,

    #[arg(
        long,
        env = "ETL_INCIDENTS_OUTPUT",
        default_value = "terrorism_cleaned.csv"
    )]
    pub incidents_output: PathBuf,

    #[arg(
        long,
        env = "ETL_INCIDENTS_OBJECT",
        default_value = "cleaned_data/terrorism_cleaned.csv"
    )]
    pub incidents_object: String,

    /// Columns missing more than this percentage of values are dropped
    #[arg(long, env = "ETL_MAX_MISSING_PERCENT", default_value_t = 50.0)]
    pub max_missing_percent: f64,

    /// Clean locally and skip every bucket step
    #[arg(long, env = "ETL_LOCAL_ONLY")]
    pub local_only: bool,

    /// Write the run report as JSON to this path
    #[arg(long, env = "ETL_REPORT")]
    pub report: Option<PathBuf>,
}

/// One dataset's local input, local output and destination object.
#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub object: String,
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` only when running local-only.
    pub bucket: Option<String>,
    pub credentials: Option<PathBuf>,
    pub prices: DatasetPaths,
    pub incidents: DatasetPaths,
    pub max_missing_percent: f64,
    pub report: Option<PathBuf>,
}

impl Settings {
    pub fn from_args(args: Args) -> Result<Self> {
        let bucket = match (args.local_only, args.bucket) {
            (true, _) => None,
            (false, Some(b)) if !b.trim().is_empty() => Some(b.trim().to_string()),
            (false, _) => bail!("a bucket name is required (--bucket or ETL_BUCKET) unless --local-only is set"),
        };

        if !(0.0..=100.0).contains(&args.max_missing_percent) {
            bail!(
                "--max-missing-percent must be within 0..=100, got {}",
                args.max_missing_percent
            );
        }

        Ok(Self {
            bucket,
            credentials: args.credentials,
            prices: DatasetPaths {
                input: args.prices_input,
                output: args.prices_output,
                object: args.prices_object,
            },
            incidents: DatasetPaths {
                input: args.incidents_input,
                output: args.incidents_output,
                object: args.incidents_object,
            },
            max_missing_percent: args.max_missing_percent,
            report: args.report,
        })
    }
}
