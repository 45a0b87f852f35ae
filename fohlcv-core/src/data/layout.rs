//! Deterministic output layout.
//!
//! Layout: `{data_root}/{TICKER}/tohlcv/{INTERVAL}/{YYYY_MM_DD}_{YYYY_MM_DD}.{ext}`
//!
//! The same ticker, interval and range always map to the same file, so a
//! re-run overwrites instead of duplicating.

use super::range::ResolvedRange;
use super::store::StorageFormat;
use crate::domain::Interval;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Where a table is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub ticker_sanitized: String,
    pub interval: String,
    /// `{start}_{end}` with both dates as `YYYY_MM_DD`.
    pub range_label: String,
    pub full_path: PathBuf,
}

impl OutputLocation {
    /// Same location with the file path replaced (explicit `--out`).
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.full_path = path.into();
        self
    }
}

/// Replace every run of characters outside `[A-Za-z0-9]` with one `_`, trimming
/// leading and trailing separators. An empty result becomes `NA`.
pub fn sanitize_token(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "NA".to_string()
    } else {
        trimmed.to_string()
    }
}

fn date_tag(date: NaiveDate) -> String {
    date.format("%Y_%m_%d").to_string()
}

/// Build the output location for a ticker, interval and date span.
pub fn build_path(
    data_root: &Path,
    ticker: &str,
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
    format: StorageFormat,
) -> OutputLocation {
    let ticker_sanitized = sanitize_token(ticker);
    let interval = sanitize_token(interval.as_str());
    let range_label = format!("{}_{}", date_tag(start), date_tag(end));

    let full_path = data_root
        .join(&ticker_sanitized)
        .join("tohlcv")
        .join(&interval)
        .join(format!("{range_label}.{}", format.extension()));

    OutputLocation {
        ticker_sanitized,
        interval,
        range_label,
        full_path,
    }
}

/// Output location for an explicitly resolved range (label uses the exclusive end).
pub fn build_path_for_range(
    data_root: &Path,
    ticker: &str,
    interval: Interval,
    range: &ResolvedRange,
    format: StorageFormat,
) -> OutputLocation {
    build_path(data_root, ticker, interval, range.start, range.end, format)
}
