//! Schema normalizer: provider table → canonical TOHLCV bars.
//!
//! Steps, in order:
//! 1. select the six required columns by name (case and separators ignored),
//!    dropping anything else the provider sent
//! 2. coerce timestamps to UTC (naive values are taken as UTC)
//! 3. stable sort ascending by time
//! 4. drop repeated times, keeping the first row of each
//!
//! The result is re-checked with [`validate_bars`]; a table that cannot meet
//! the invariants is an error, never a partial result.

use super::provider::DataError;
use super::raw::{RawColumn, RawTable, RawTimestamp, RawValues};
use super::schema::{validate_bars, SchemaError};
use crate::domain::CanonicalBar;
use tracing::debug;

/// Accepted source names for the time column, after name folding.
const TIME_ALIASES: [&str; 4] = ["time", "timestamp", "datetime", "date"];

/// Canonicalizer for provider tables
pub struct Canonicalizer;

impl Canonicalizer {
    /// Normalize a provider table into sorted, de-duplicated UTC bars.
    pub fn normalize(table: RawTable) -> Result<Vec<CanonicalBar>, DataError> {
        let selected = select_columns(table)?;
        let rows = selected.times.len();

        let mut bars: Vec<CanonicalBar> = (0..rows)
            .map(|i| CanonicalBar {
                time: selected.times[i].to_utc(),
                open: selected.open[i].unwrap_or(f64::NAN),
                high: selected.high[i].unwrap_or(f64::NAN),
                low: selected.low[i].unwrap_or(f64::NAN),
                close: selected.close[i].unwrap_or(f64::NAN),
                volume: selected.volume[i].unwrap_or(f64::NAN),
            })
            .collect();

        bars.sort_by_key(|b| b.time);
        bars.dedup_by_key(|b| b.time);

        if bars.len() < rows {
            debug!(
                dropped = rows - bars.len(),
                "removed rows with duplicate timestamps"
            );
        }

        validate_bars(&bars)?;
        Ok(bars)
    }
}

/// Convenience wrapper for [`Canonicalizer::normalize`].
pub fn normalize(table: RawTable) -> Result<Vec<CanonicalBar>, DataError> {
    Canonicalizer::normalize(table)
}

struct SelectedColumns {
    times: Vec<RawTimestamp>,
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Lowercase and strip everything but letters and digits: `Adj Close` → `adjclose`.
fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn select_columns(table: RawTable) -> Result<SelectedColumns, SchemaError> {
    let mut times = None;
    let mut open = None;
    let mut high = None;
    let mut low = None;
    let mut close = None;
    let mut volume = None;

    for RawColumn { name, values } in table.into_columns() {
        let folded = fold_name(&name);
        let slot = match folded.as_str() {
            f if TIME_ALIASES.contains(&f) => {
                if times.is_none() {
                    times = Some(expect_timestamps("time", values)?);
                }
                continue;
            }
            "open" => &mut open,
            "high" => &mut high,
            "low" => &mut low,
            "close" => &mut close,
            "volume" => &mut volume,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(expect_numbers(&folded, values)?);
        }
    }

    let times = times.ok_or_else(|| SchemaError::MissingColumn("time".into()))?;
    let require = |col: Option<Vec<Option<f64>>>,
                   name: &str|
     -> Result<Vec<Option<f64>>, SchemaError> {
        let values = col.ok_or_else(|| SchemaError::MissingColumn(name.to_string()))?;
        if values.len() != times.len() {
            return Err(SchemaError::LengthMismatch {
                column: name.to_string(),
                expected: times.len(),
                actual: values.len(),
            });
        }
        Ok(values)
    };

    Ok(SelectedColumns {
        open: require(open, "open")?,
        high: require(high, "high")?,
        low: require(low, "low")?,
        close: require(close, "close")?,
        volume: require(volume, "volume")?,
        times,
    })
}

fn expect_timestamps(column: &str, values: RawValues) -> Result<Vec<RawTimestamp>, SchemaError> {
    match values {
        RawValues::Timestamps(v) => Ok(v),
        other => Err(SchemaError::TypeMismatch {
            column: column.to_string(),
            expected: "timestamp".into(),
            actual: other.kind().into(),
        }),
    }
}

fn expect_numbers(column: &str, values: RawValues) -> Result<Vec<Option<f64>>, SchemaError> {
    match values {
        RawValues::Numbers(v) => Ok(v),
        other => Err(SchemaError::TypeMismatch {
            column: column.to_string(),
            expected: "number".into(),
            actual: other.kind().into(),
        }),
    }
}
