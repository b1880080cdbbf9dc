use anyhow::{Context, Result};
use arrow::{array::ArrayRef, record_batch::RecordBatch};
use std::{path::Path, sync::Arc};
use tracing::{info, instrument};

use super::{dates, numeric, CleanSummary};
use crate::table::{self, drop_columns, has_column, replace_column, string_column};

pub const DATE_COLUMN: &str = "Date";
pub const PRICE_COLUMNS: [&str; 4] = ["Price", "Open", "High", "Low"];
pub const CHANGE_COLUMN: &str = "Change %";
pub const VOLUME_COLUMN: &str = "Vol.";

/// Clean a daily price export (`Date, Price, Open, High, Low, Vol., Change %`)
/// and write it to `output`.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn clean_price_series(input: &Path, output: &Path) -> Result<CleanSummary> {
    let raw = table::read_csv(input)?;
    let rows_in = raw.num_rows();

    let cleaned = clean_price_batch(&raw)?;
    let columns_dropped = if has_column(&raw, VOLUME_COLUMN) {
        vec![VOLUME_COLUMN.to_string()]
    } else {
        Vec::new()
    };

    table::write_csv(&cleaned, output)?;
    info!("Cleaned price data saved to {}", output.display());

    Ok(CleanSummary {
        rows_in,
        rows_out: cleaned.num_rows(),
        columns_dropped,
        output: output.to_path_buf(),
    })
}

/// The in-memory half of [`clean_price_series`].
pub fn clean_price_batch(raw: &RecordBatch) -> Result<RecordBatch> {
    let dates = dates::reformat_dates(string_column(raw, DATE_COLUMN)?, DATE_COLUMN)?;
    let mut batch = replace_column(raw, DATE_COLUMN, Arc::new(dates) as ArrayRef)?;

    for name in PRICE_COLUMNS {
        let values = numeric::parse_stripped(string_column(&batch, name)?, name, &[','])?;
        batch = replace_column(&batch, name, Arc::new(values) as ArrayRef)?;
    }

    let change = numeric::parse_stripped(
        string_column(&batch, CHANGE_COLUMN)?,
        CHANGE_COLUMN,
        &['%'],
    )?;
    batch = replace_column(&batch, CHANGE_COLUMN, Arc::new(change) as ArrayRef)?;

    if has_column(&batch, VOLUME_COLUMN) {
        batch = drop_columns(&batch, &[VOLUME_COLUMN]).context("dropping volume column")?;
    }

    Ok(batch)
}
