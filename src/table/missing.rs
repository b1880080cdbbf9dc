use anyhow::{Context, Result};
use arrow::{
    array::{Array, BooleanArray},
    compute::filter_record_batch,
    record_batch::RecordBatch,
};

/// Percentage of missing values in every column, in column order.
pub fn missing_percent(batch: &RecordBatch) -> Vec<(String, f64)> {
    let rows = batch.num_rows();
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| {
            let pct = if rows == 0 {
                0.0
            } else {
                col.null_count() as f64 / rows as f64 * 100.0
            };
            (field.name().clone(), pct)
        })
        .collect()
}

/// Drop every column missing more than `max_percent` of its values.
/// Returns the trimmed batch and the dropped column names.
pub fn drop_sparse_columns(
    batch: &RecordBatch,
    max_percent: f64,
) -> Result<(RecordBatch, Vec<String>)> {
    let mut keep = Vec::with_capacity(batch.num_columns());
    let mut dropped = Vec::new();

    for (i, (name, pct)) in missing_percent(batch).into_iter().enumerate() {
        if pct > max_percent {
            dropped.push(name);
        } else {
            keep.push(i);
        }
    }

    let trimmed = batch
        .project(&keep)
        .context("projecting non-sparse columns")?;
    Ok((trimmed, dropped))
}

/// Keep only rows without a missing value in any column.
pub fn drop_incomplete_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    if batch.columns().iter().all(|c| c.null_count() == 0) {
        return Ok(batch.clone());
    }

    let mask: BooleanArray = (0..batch.num_rows())
        .map(|row| Some(batch.columns().iter().all(|c| c.is_valid(row))))
        .collect();

    filter_record_batch(batch, &mask).context("filtering incomplete rows")
}
