//! Columnar storage of canonical tables.
//!
//! Features:
//! - Parquet (`time` as `Datetime(ns, UTC)`, prices/volume as `Float64`) or CSV
//!   (`time` as RFC 3339, fractional seconds only when present)
//! - Exactly six columns in `time, open, high, low, close, volume` order
//! - Atomic writes (write to `{file}.tmp`, rename into place), so a failed
//!   write leaves the previous file untouched
//! - Schema validation on read

use super::layout::OutputLocation;
use super::provider::DataError;
use super::schema::{validate_bars, SchemaError, TohlcvSchema, UTC};
use crate::domain::bar::{CanonicalBar, TOHLCV_COLUMNS};
use crate::domain::ParseError;
use chrono::{DateTime, SecondsFormat, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// On-disk table format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    #[default]
    Parquet,
    Csv,
}

impl StorageFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            StorageFormat::Parquet => "parquet",
            StorageFormat::Csv => "csv",
        }
    }

    /// Format implied by a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "parquet" => Some(StorageFormat::Parquet),
            "csv" => Some(StorageFormat::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for StorageFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parquet" => Ok(StorageFormat::Parquet),
            "csv" => Ok(StorageFormat::Csv),
            _ => Err(ParseError::UnknownFormat(s.trim().to_string())),
        }
    }
}

/// Write bars to `location.full_path`, creating parent directories and
/// replacing any existing file.
pub fn write(
    bars: &[CanonicalBar],
    location: &OutputLocation,
    format: StorageFormat,
) -> Result<(), DataError> {
    if bars.is_empty() {
        return Err(DataError::Storage("no bars to write".into()));
    }

    let path = &location.full_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            DataError::Storage(format!("failed to create dir {}: {e}", parent.display()))
        })?;
    }

    let tmp_path = tmp_path_for(path)?;
    let written = match format {
        StorageFormat::Parquet => write_parquet(bars, &tmp_path),
        StorageFormat::Csv => write_csv(bars, &tmp_path),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // Atomic rename
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::Storage(format!("atomic rename to {} failed: {e}", path.display()))
    })?;

    debug!(path = %path.display(), rows = bars.len(), %format, "table written");
    Ok(())
}

/// Load a table written by [`write`], choosing the format from the extension.
pub fn read(path: &Path) -> Result<Vec<CanonicalBar>, DataError> {
    let format = StorageFormat::from_path(path).ok_or_else(|| {
        DataError::Storage(format!("unsupported extension: {}", path.display()))
    })?;
    let bars = match format {
        StorageFormat::Parquet => read_parquet(path)?,
        StorageFormat::Csv => read_csv(path)?,
    };
    validate_bars(&bars)?;
    Ok(bars)
}

fn tmp_path_for(path: &Path) -> Result<PathBuf, DataError> {
    let name = path
        .file_name()
        .ok_or_else(|| DataError::Storage(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert canonical bars to a Polars DataFrame.
fn bars_to_dataframe(bars: &[CanonicalBar]) -> Result<DataFrame, DataError> {
    let times: Vec<i64> = bars
        .iter()
        .map(|b| {
            b.time.timestamp_nanos_opt().ok_or_else(|| {
                DataError::Storage(format!("time {} outside the nanosecond range", b.time))
            })
        })
        .collect::<Result<_, _>>()?;
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        Column::new("time".into(), times)
            .cast(&DataType::Datetime(TimeUnit::Nanoseconds, Some(UTC.into())))
            .map_err(|e| DataError::Storage(format!("time cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Storage(format!("dataframe creation: {e}")))?;

    TohlcvSchema::validate(&df)?;
    Ok(df)
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(bars: &[CanonicalBar], path: &Path) -> Result<(), DataError> {
    let mut df = bars_to_dataframe(bars)?;
    let file = fs::File::create(path)
        .map_err(|e| DataError::Storage(format!("create {}: {e}", path.display())))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| DataError::Storage(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and validate its schema.
fn read_parquet(path: &Path) -> Result<Vec<CanonicalBar>, DataError> {
    let file = fs::File::open(path)
        .map_err(|e| DataError::Storage(format!("open {}: {e}", path.display())))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Storage(format!("read parquet: {e}")))?;

    TohlcvSchema::validate(&df)?;
    dataframe_to_bars(&df)
}

/// Convert a validated DataFrame back to bars.
fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<CanonicalBar>, DataError> {
    let map_err = |e: PolarsError| DataError::Storage(format!("column read: {e}"));

    let time_col = df.column("time").map_err(map_err)?;
    let to_nanos: fn(i64) -> Option<i64> = match time_col.dtype() {
        DataType::Datetime(TimeUnit::Milliseconds, _) => |v| v.checked_mul(1_000_000),
        DataType::Datetime(TimeUnit::Microseconds, _) => |v| v.checked_mul(1_000),
        _ => Some,
    };
    let time_phys = time_col.cast(&DataType::Int64).map_err(map_err)?;
    let time_ca = time_phys.i64().map_err(map_err)?;

    let f64_col = |name: &str| -> Result<Float64Chunked, DataError> {
        Ok(df.column(name).map_err(map_err)?.f64().map_err(map_err)?.clone())
    };
    let open_ca = f64_col("open")?;
    let high_ca = f64_col("high")?;
    let low_ca = f64_col("low")?;
    let close_ca = f64_col("close")?;
    let vol_ca = f64_col("volume")?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let raw = time_ca
            .get(i)
            .ok_or_else(|| DataError::Storage(format!("null time at row {i}")))?;
        let time = to_nanos(raw)
            .map(DateTime::<Utc>::from_timestamp_nanos)
            .ok_or_else(|| DataError::Storage(format!("time out of range at row {i}")))?;

        bars.push(CanonicalBar {
            time,
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(f64::NAN),
        });
    }

    Ok(bars)
}

// ── CSV I/O helpers ─────────────────────────────────────────────────

fn write_csv(bars: &[CanonicalBar], path: &Path) -> Result<(), DataError> {
    let csv_err = |e: csv::Error| DataError::Storage(format!("write csv: {e}"));
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;

    wtr.write_record(TOHLCV_COLUMNS).map_err(csv_err)?;
    for b in bars {
        wtr.write_record([
            b.time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])
        .map_err(csv_err)?;
    }

    wtr.flush()
        .map_err(|e| DataError::Storage(format!("flush csv: {e}")))?;
    Ok(())
}

fn read_csv(path: &Path) -> Result<Vec<CanonicalBar>, DataError> {
    let csv_err = |e: csv::Error| DataError::Storage(format!("read csv: {e}"));
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers != TOHLCV_COLUMNS {
        return Err(SchemaError::ColumnOrder(headers).into());
    }

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_err)?;
        let field = |idx: usize| record.get(idx).unwrap_or_default();
        let number = |idx: usize| -> Result<f64, SchemaError> {
            field(idx)
                .parse::<f64>()
                .map_err(|_| SchemaError::TypeMismatch {
                    column: TOHLCV_COLUMNS[idx].to_string(),
                    expected: "f64".into(),
                    actual: field(idx).to_string(),
                })
        };

        let time = DateTime::parse_from_rfc3339(field(0))
            .map_err(|_| SchemaError::TypeMismatch {
                column: "time".into(),
                expected: "RFC 3339 timestamp".into(),
                actual: field(0).to_string(),
            })?
            .with_timezone(&Utc);

        bars.push(CanonicalBar {
            time,
            open: number(1)?,
            high: number(2)?,
            low: number(3)?,
            close: number(4)?,
            volume: number(5)?,
        });
    }

    Ok(bars)
}
