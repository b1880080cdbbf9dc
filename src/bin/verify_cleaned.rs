// src/bin/verify_cleaned.rs
// Re-read a cleaned CSV and check it still satisfies the cleaning guarantees.

use anyhow::{Context, Result};
use bucketclean::{clean::verify, table};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Prices,
    Incidents,
}

#[derive(Parser, Debug)]
struct Args {
    /// Which dataset the file holds
    #[arg(long, value_enum)]
    kind: Kind,

    /// Sparsity threshold the incident file was cleaned with
    #[arg(long, default_value_t = 50.0)]
    max_missing_percent: f64,

    /// Cleaned CSV to check
    path: PathBuf,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .init();

    let args = Args::parse();
    let batch = table::read_csv(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "loaded {}",
        args.path.display()
    );

    match args.kind {
        Kind::Prices => verify::verify_price_series(&batch)?,
        Kind::Incidents => verify::verify_incident_records(&batch, args.max_missing_percent)?,
    }
    verify::verify_round_trip(&args.path, batch.num_rows())?;

    info!("{} passes all {:?} checks", args.path.display(), args.kind);
    Ok(())
}
