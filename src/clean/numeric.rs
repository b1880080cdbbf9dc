use anyhow::{bail, Result};
use arrow::array::{Array, Float64Array, Float64Builder, StringArray};

/// Remove every `strip` character from each value and parse the rest as `f64`.
/// Nulls pass through; anything else that fails to parse fails the column.
pub fn parse_stripped(column: &StringArray, name: &str, strip: &[char]) -> Result<Float64Array> {
    let mut b = Float64Builder::with_capacity(column.len());
    for (row, opt) in column.iter().enumerate() {
        let Some(raw) = opt else {
            b.append_null();
            continue;
        };
        let cleaned: String = raw.chars().filter(|c| !strip.contains(c)).collect();
        match cleaned.trim().parse::<f64>() {
            Ok(v) => b.append_value(v),
            Err(_) => bail!("column '{}' row {}: cannot read '{}' as a number", name, row, raw),
        }
    }
    Ok(b.finish())
}
