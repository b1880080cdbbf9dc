pub mod missing;

use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray},
    compute::concat_batches,
    csv::{ReaderBuilder, WriterBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
    sync::Arc,
};
use tracing::debug;

const BATCH_SIZE: usize = 8192;

/// Fields read as missing: empty, plus the usual NA/NaN/NULL spellings.
static NULL_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(|#N/A|#N/A N/A|#NA|-1\.#IND|-1\.#QNAN|-NaN|-nan|1\.#IND|1\.#QNAN|<NA>|N/A|NA|NULL|NaN|None|n/a|nan|null)$",
    )
    .expect("null token regex should compile")
});

/// Read a CSV with a header row into a single batch of `Utf8` columns.
pub fn read_csv(path: &Path) -> Result<RecordBatch> {
    let headers: Vec<String> = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        bail!("{} has no header row", path.display());
    }

    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(n, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_null_regex(NULL_TOKENS.clone())
        .build(BufReader::new(file))
        .context("creating CSV reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {}", path.display()))?;
    let batch = concat_batches(&schema, &batches).context("concatenating CSV batches")?;

    debug!(
        file = %path.display(),
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "read csv"
    );
    Ok(batch)
}

/// Write `batch` as CSV with a header row and no index column.
pub fn write_csv(batch: &RecordBatch, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer
        .write(batch)
        .with_context(|| format!("writing {}", path.display()))?;
    drop(writer);

    debug!(file = %path.display(), rows = batch.num_rows(), "wrote csv");
    Ok(())
}

/// Number of data rows in the CSV at `path`.
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = 0;
    for record in rdr.records() {
        record.with_context(|| format!("CSV parse error in {} at record {}", path.display(), rows))?;
        rows += 1;
    }
    Ok(rows)
}

pub fn column_index(batch: &RecordBatch, name: &str) -> Result<usize> {
    batch
        .schema_ref()
        .index_of(name)
        .map_err(|_| anyhow!("column '{}' not found", name))
}

pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema_ref().index_of(name).is_ok()
}

/// Borrow the named column as a string array.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let idx = column_index(batch, name)?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column '{}' is not a string column", name))
}

/// Swap the named column for `values`, keeping its position.
pub fn replace_column(batch: &RecordBatch, name: &str, values: ArrayRef) -> Result<RecordBatch> {
    let idx = column_index(batch, name)?;
    let schema = batch.schema();

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == idx {
                Field::new(name, values.data_type().clone(), true)
            } else {
                f.as_ref().clone()
            }
        })
        .collect();
    let mut columns = batch.columns().to_vec();
    columns[idx] = values;

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .with_context(|| format!("replacing column '{}'", name))
}

/// Add `values` as a new last column, or overwrite an existing column of that name in place.
pub fn append_column(batch: &RecordBatch, name: &str, values: ArrayRef) -> Result<RecordBatch> {
    if has_column(batch, name) {
        return replace_column(batch, name, values);
    }

    let mut fields: Vec<Field> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    fields.push(Field::new(name, values.data_type().clone(), true));
    let mut columns = batch.columns().to_vec();
    columns.push(values);

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .with_context(|| format!("appending column '{}'", name))
}

/// Drop the named columns. Every name must exist.
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    for name in names {
        column_index(batch, name)?;
    }
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();

    batch.project(&keep).context("projecting remaining columns")
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

#[cfg(test)]
pub(crate) fn batch_from_rows(headers: &[&str], rows: &[&[Option<&str>]]) -> RecordBatch {
    let fields: Vec<Field> = headers
        .iter()
        .map(|n| Field::new(*n, DataType::Utf8, true))
        .collect();
    let columns: Vec<ArrayRef> = (0..headers.len())
        .map(|c| Arc::new(rows.iter().map(|r| r[c]).collect::<StringArray>()) as ArrayRef)
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).unwrap()
}
