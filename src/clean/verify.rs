//! Post-conditions of the cleaned datasets.
//!
//! Every check accepts both the in-memory batch (typed columns) and a batch
//! re-read from the written CSV (all `Utf8`).

use anyhow::{bail, Context, Result};
use arrow::{
    array::{Array, StringArray},
    datatypes::DataType,
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use super::{incidents, prices};
use crate::table::{self, column_index, has_column, missing::missing_percent};

static SHORT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{2}$").expect("date regex should compile"));

pub fn verify_price_series(batch: &RecordBatch) -> Result<()> {
    if has_column(batch, prices::VOLUME_COLUMN) {
        bail!("column '{}' should have been dropped", prices::VOLUME_COLUMN);
    }
    check_short_dates(batch, prices::DATE_COLUMN)?;
    for name in prices::PRICE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(prices::CHANGE_COLUMN))
    {
        check_numeric(batch, name)?;
    }
    Ok(())
}

pub fn verify_incident_records(batch: &RecordBatch, max_missing_percent: f64) -> Result<()> {
    for name in [
        incidents::YEAR_COLUMN,
        incidents::MONTH_COLUMN,
        incidents::DAY_COLUMN,
    ] {
        if has_column(batch, name) {
            bail!("column '{}' should have been dropped", name);
        }
    }

    let date_columns = batch
        .schema()
        .fields()
        .iter()
        .filter(|f| f.name() == incidents::DATE_COLUMN)
        .count();
    if date_columns != 1 {
        bail!(
            "expected exactly one '{}' column, found {}",
            incidents::DATE_COLUMN,
            date_columns
        );
    }
    check_short_dates(batch, incidents::DATE_COLUMN)?;

    for (name, pct) in missing_percent(batch) {
        if pct > max_missing_percent {
            bail!(
                "column '{}' is {:.2}% missing, above {}%",
                name,
                pct,
                max_missing_percent
            );
        }
        if pct > 0.0 {
            bail!("column '{}' still has missing values", name);
        }
    }
    Ok(())
}

/// Re-read `path` and confirm the write kept every row.
pub fn verify_round_trip(path: &Path, expected_rows: usize) -> Result<()> {
    let rows = table::count_rows(path)
        .with_context(|| format!("re-reading {}", path.display()))?;
    if rows != expected_rows {
        bail!(
            "{} holds {} rows but {} were cleaned",
            path.display(),
            rows,
            expected_rows
        );
    }
    Ok(())
}

fn check_short_dates(batch: &RecordBatch, name: &str) -> Result<()> {
    let col = batch.column(column_index(batch, name)?);
    let dates = col
        .as_any()
        .downcast_ref::<StringArray>()
        .with_context(|| format!("column '{}' should hold text dates", name))?;
    for (row, value) in dates.iter().enumerate() {
        if let Some(v) = value {
            if !SHORT_DATE.is_match(v) {
                bail!("column '{}' row {}: '{}' is not MM/DD/YY", name, row, v);
            }
        }
    }
    Ok(())
}

fn check_numeric(batch: &RecordBatch, name: &str) -> Result<()> {
    let col = batch.column(column_index(batch, name)?);
    match col.data_type() {
        DataType::Float64 => Ok(()),
        DataType::Utf8 => {
            let values = col
                .as_any()
                .downcast_ref::<StringArray>()
                .with_context(|| format!("column '{}' is not a string column", name))?;
            for (row, value) in values.iter().enumerate() {
                let Some(v) = value else { continue };
                if v.contains(',') || v.contains('%') || v.parse::<f64>().is_err() {
                    bail!("column '{}' row {}: '{}' is not a plain number", name, row, v);
                }
            }
            Ok(())
        }
        other => bail!("column '{}' has unexpected type {:?}", name, other),
    }
}
