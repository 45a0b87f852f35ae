//! CanonicalBar: one row of the persisted TOHLCV table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A TOHLCV bar after normalization.
///
/// `time` is always UTC. Prices and volume are stored as `f64`; a cell the
/// provider left empty is `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl CanonicalBar {
    /// Returns true if every price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() && self.high.is_nan() && self.low.is_nan() && self.close.is_nan()
    }
}

/// Column names of the canonical table, in storage order.
pub const TOHLCV_COLUMNS: [&str; 6] = ["time", "open", "high", "low", "close", "volume"];
