pub mod dates;
pub mod incidents;
pub mod numeric;
pub mod prices;
pub mod verify;

pub use incidents::clean_incident_records;
pub use prices::clean_price_series;

use serde::Serialize;
use std::path::PathBuf;

/// What a cleaning routine did to its dataset.
#[derive(Debug, Clone, Serialize)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub columns_dropped: Vec<String>,
    pub output: PathBuf,
}
