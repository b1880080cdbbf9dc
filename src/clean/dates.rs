use anyhow::{bail, Result};
use arrow::array::{Array, StringArray, StringBuilder};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Output layout for every cleaned date: `MM/DD/YY`.
pub const OUTPUT_FORMAT: &str = "%m/%d/%y";

/// Tried in order. Four-digit-year layouts must come before `%m/%d/%y`.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%m/%d/%y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Lenient parse of the date layouts price exports commonly use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDate::parse_from_str(s, fmt)
                .ok()
                // "01/02/24" would otherwise land in the year 24
                .filter(|d| !fmt.contains("%Y") || d.year() >= 1000)
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_FORMAT).to_string()
}

/// Build a date from separate year/month/day fields. Invalid calendar
/// dates (day 0, month 13, Feb 30) give `None`.
pub fn date_from_parts(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let y = parse_whole(year)?;
    let m = parse_whole(month)?;
    let d = parse_whole(day)?;
    NaiveDate::from_ymd_opt(y, u32::try_from(m).ok()?, u32::try_from(d).ok()?)
}

/// Accepts `2001` as well as `2001.0`.
fn parse_whole(s: &str) -> Option<i32> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let f: f64 = s.parse().ok()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Rewrite every date in `column` as `MM/DD/YY`. A value that does not
/// parse fails the whole column; nulls pass through.
pub fn reformat_dates(column: &StringArray, name: &str) -> Result<StringArray> {
    let mut b = StringBuilder::with_capacity(column.len(), column.len() * 8);
    for (row, opt) in column.iter().enumerate() {
        match opt {
            None => b.append_null(),
            Some(raw) => match parse_date(raw) {
                Some(d) => b.append_value(format_date(d)),
                None => bail!("column '{}' row {}: unrecognised date '{}'", name, row, raw),
            },
        }
    }
    Ok(b.finish())
}

/// Assemble `MM/DD/YY` dates from year/month/day columns. Rows where any
/// part is missing or the date is impossible become null.
pub fn combine_date_parts(
    year: &StringArray,
    month: &StringArray,
    day: &StringArray,
) -> StringArray {
    year.iter()
        .zip(month.iter())
        .zip(day.iter())
        .map(|((y, m), d)| match (y, m, d) {
            (Some(y), Some(m), Some(d)) => date_from_parts(y, m, d).map(format_date),
            _ => None,
        })
        .collect()
}
