use anyhow::Result;
use bucketclean::{
    config::{Args, Settings},
    pipeline,
    storage::GcsStore,
};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
    info!("startup");

    // ─── 2) configuration ───────────────────────────────────────────
    let settings = Settings::from_args(Args::parse())?;
    info!(
        bucket = ?settings.bucket,
        prices = %settings.prices.input.display(),
        incidents = %settings.incidents.input.display(),
        "configuration"
    );

    // ─── 3) bucket client ───────────────────────────────────────────
    let store = match &settings.bucket {
        None => {
            info!("local-only run, bucket steps will be skipped");
            None
        }
        Some(_) => match GcsStore::connect(settings.credentials.as_deref()).await {
            Ok(store) => Some(store),
            Err(e) => {
                error!("An error occurred: {:#}", e);
                None
            }
        },
    };

    // ─── 4) run every step ──────────────────────────────────────────
    let report = pipeline::run(&settings, store.as_ref()).await;

    if let Some(path) = &settings.report {
        match report.write_json(path) {
            Ok(()) => info!("wrote run report to {}", path.display()),
            Err(e) => error!("{:#}", e),
        }
    }

    match report.failures() {
        0 => info!("all done"),
        n => warn!(failed_steps = n, "finished with failures"),
    }
    Ok(())
}
