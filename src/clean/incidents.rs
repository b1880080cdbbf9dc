use anyhow::Result;
use arrow::{array::ArrayRef, record_batch::RecordBatch};
use std::{path::Path, sync::Arc};
use tracing::{info, instrument};

use super::{dates, CleanSummary};
use crate::table::{
    self, append_column, drop_columns,
    missing::{drop_incomplete_rows, drop_sparse_columns, missing_percent},
    string_column,
};

pub const DATE_COLUMN: &str = "Date";
pub const YEAR_COLUMN: &str = "iyear";
pub const MONTH_COLUMN: &str = "imonth";
pub const DAY_COLUMN: &str = "iday";

/// Clean an incident-record export and write it to `output`.
///
/// The split `iyear/imonth/iday` fields become one `Date` column, then any
/// column missing more than `max_missing_percent` of its values is dropped,
/// then any row still holding a missing value is dropped.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn clean_incident_records(
    input: &Path,
    output: &Path,
    max_missing_percent: f64,
) -> Result<CleanSummary> {
    let raw = table::read_csv(input)?;
    let rows_in = raw.num_rows();

    let (cleaned, columns_dropped) = clean_incident_batch(&raw, max_missing_percent)?;

    table::write_csv(&cleaned, output)?;
    info!("Cleaned incident data saved to {}", output.display());

    Ok(CleanSummary {
        rows_in,
        rows_out: cleaned.num_rows(),
        columns_dropped,
        output: output.to_path_buf(),
    })
}

/// The in-memory half of [`clean_incident_records`]. Returns the cleaned
/// batch and the sparse columns that were removed.
pub fn clean_incident_batch(
    raw: &RecordBatch,
    max_missing_percent: f64,
) -> Result<(RecordBatch, Vec<String>)> {
    let date = dates::combine_date_parts(
        string_column(raw, YEAR_COLUMN)?,
        string_column(raw, MONTH_COLUMN)?,
        string_column(raw, DAY_COLUMN)?,
    );
    let with_date = append_column(raw, DATE_COLUMN, Arc::new(date) as ArrayRef)?;
    let batch = drop_columns(&with_date, &[YEAR_COLUMN, MONTH_COLUMN, DAY_COLUMN])?;

    info!("Percentage of missing values per column:");
    for (name, pct) in missing_percent(&batch) {
        info!("  {:<32} {:>7.3}", name, pct);
    }

    let (batch, dropped) = drop_sparse_columns(&batch, max_missing_percent)?;
    info!("Columns dropped: {:?}", dropped);

    let batch = drop_incomplete_rows(&batch)?;
    info!(
        "Number of rows after removing rows with NA: {}",
        batch.num_rows()
    );

    Ok((batch, dropped))
}
