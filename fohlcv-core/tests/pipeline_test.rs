//! Integration tests for the download pipeline using an in-memory provider.
//!
//! Tests:
//! 1. End-to-end run lands at the deterministic layout path and reads back
//! 2. Re-running the same query overwrites the same file with the same content
//! 3. An empty provider response is NoData and writes nothing
//! 4. A failing run leaves the previous output untouched
//! 5. Exchange-local timestamps are stored as UTC, sorted and de-duplicated

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use fohlcv_core::data::{
    store, DataError, DataProvider, RawTable, RawTimestamp, Resolution, SchemaError,
    StorageFormat,
};
use fohlcv_core::domain::{Interval, Period, Query};
use fohlcv_core::{Config, Pipeline, RunOptions};
use std::path::Path;
use tempfile::TempDir;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Provider backed by a closure, so each test decides what the "remote" returns.
struct FnProvider<F>(F);

impl<F> DataProvider for FnProvider<F>
where
    F: Fn(&str, Interval, &Resolution) -> Result<RawTable, DataError>,
{
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        window: &Resolution,
    ) -> Result<RawTable, DataError> {
        (self.0)(ticker, interval, window)
    }
}

/// Provider-shaped table of `n` hourly bars starting at `start` in `offset`.
fn hourly_table(start: DateTime<FixedOffset>, n: usize) -> RawTable {
    let times: Vec<RawTimestamp> = (0..n)
        .map(|i| RawTimestamp::Zoned(start + Duration::hours(i as i64)))
        .collect();
    let close: Vec<Option<f64>> = (0..n).map(|i| Some(100.0 + i as f64 * 0.25)).collect();
    let open: Vec<Option<f64>> = close.iter().map(|c| c.map(|c| c - 0.1)).collect();
    let high: Vec<Option<f64>> = close.iter().map(|c| c.map(|c| c + 0.5)).collect();
    let low: Vec<Option<f64>> = close.iter().map(|c| c.map(|c| c - 0.5)).collect();
    let volume: Vec<Option<f64>> = (0..n).map(|i| Some(1_000.0 + i as f64)).collect();

    RawTable::new()
        .with_timestamps("Datetime", times)
        .with_numbers("Open", open)
        .with_numbers("High", high)
        .with_numbers("Low", low)
        .with_numbers("Close", close)
        .with_numbers("Adj Close", vec![None; n])
        .with_numbers("Volume", volume)
}

fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn btc_table() -> RawTable {
    hourly_table(
        utc_offset().with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        48,
    )
}

fn config(root: &Path, format: StorageFormat) -> Config {
    Config {
        data_root: root.join("data"),
        format,
        ..Config::default()
    }
}

fn btc_query() -> Query {
    Query::range(
        "BTC-USD",
        Interval::Hour1,
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
    )
    .unwrap()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn end_to_end_btc_hourly_lands_at_layout_path() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Parquet);
    let provider = FnProvider(|_: &str, _: Interval, _: &Resolution| Ok(btc_table()));

    let report = Pipeline::new(&config, &provider)
        .run(&btc_query(), &RunOptions::default())
        .unwrap();

    let expected = dir
        .path()
        .join("data/BTC_USD/tohlcv/1h/2025_01_01_2026_01_01.parquet");
    let location = report.location.as_ref().unwrap();
    assert_eq!(location.full_path, expected);
    assert!(expected.exists());

    let stored = store::read(&expected).unwrap();
    assert_eq!(stored.len(), 48);
    assert_eq!(stored, report.bars);
    assert_eq!(
        stored[0].time,
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    );
}

#[test]
fn provider_receives_resolved_window() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Csv);
    let provider = FnProvider(|ticker: &str, interval: Interval, window: &Resolution| {
        assert_eq!(ticker, "SPY");
        assert_eq!(interval, Interval::Day1);
        assert_eq!(*window, Resolution::Period(Period::YearToDate));
        Ok(btc_table())
    });
    let query = Query::period("SPY", Interval::Day1, Period::YearToDate).unwrap();

    Pipeline::new(&config, &provider)
        .run(&query, &RunOptions::default())
        .unwrap();
}

#[test]
fn rerun_overwrites_same_csv_with_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Csv);
    let provider = FnProvider(|_: &str, _: Interval, _: &Resolution| Ok(btc_table()));
    let pipeline = Pipeline::new(&config, &provider);

    let first = pipeline.run(&btc_query(), &RunOptions::default()).unwrap();
    let path = first.location.unwrap().full_path;
    let first_bytes = std::fs::read(&path).unwrap();

    let second = pipeline.run(&btc_query(), &RunOptions::default()).unwrap();
    assert_eq!(second.location.unwrap().full_path, path);
    assert_eq!(std::fs::read(&path).unwrap(), first_bytes);

    let siblings = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(siblings, 1, "re-run must not leave extra files");
}

#[test]
fn rerun_overwrites_same_parquet_with_identical_table() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Parquet);
    let provider = FnProvider(|_: &str, _: Interval, _: &Resolution| Ok(btc_table()));
    let pipeline = Pipeline::new(&config, &provider);

    let first = pipeline.run(&btc_query(), &RunOptions::default()).unwrap();
    let second = pipeline.run(&btc_query(), &RunOptions::default()).unwrap();

    let path = first.location.unwrap().full_path;
    assert_eq!(second.location.unwrap().full_path, path);
    assert_eq!(first.bars, second.bars);
    assert_eq!(store::read(&path).unwrap(), second.bars);
}

#[test]
fn empty_response_is_no_data_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Parquet);
    let provider = FnProvider(|ticker: &str, interval: Interval, _: &Resolution| {
        Err(DataError::NoData {
            ticker: ticker.to_string(),
            interval,
            reason: "empty timestamp list".into(),
        })
    });

    let err = Pipeline::new(&config, &provider)
        .run(&btc_query(), &RunOptions::default())
        .unwrap_err();

    assert!(matches!(err, DataError::NoData { .. }));
    assert!(!config.data_root.exists(), "no directory should be created");
}

#[test]
fn empty_table_is_no_data_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Parquet);
    let provider = FnProvider(|_: &str, _: Interval, _: &Resolution| Ok(hourly_table(
        utc_offset().with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        0,
    )));

    let err = Pipeline::new(&config, &provider)
        .run(&btc_query(), &RunOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        DataError::NoData { ref ticker, interval: Interval::Hour1, .. } if ticker == "BTC-USD"
    ));
    assert!(!config.data_root.exists());
}

#[test]
fn failed_run_leaves_previous_output_untouched() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Csv);

    let good = FnProvider(|_: &str, _: Interval, _: &Resolution| Ok(btc_table()));
    let report = Pipeline::new(&config, &good)
        .run(&btc_query(), &RunOptions::default())
        .unwrap();
    let path = report.location.unwrap().full_path;
    let before = std::fs::read(&path).unwrap();

    // Same query, but the provider dropped the volume column
    let broken = FnProvider(|_: &str, _: Interval, _: &Resolution| {
        let n = 3;
        let start = utc_offset().with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let times = (0..n)
            .map(|i| RawTimestamp::Zoned(start + Duration::hours(i)))
            .collect();
        Ok(RawTable::new()
            .with_timestamps("Datetime", times)
            .with_numbers("Open", vec![Some(1.0); 3])
            .with_numbers("High", vec![Some(1.0); 3])
            .with_numbers("Low", vec![Some(1.0); 3])
            .with_numbers("Close", vec![Some(1.0); 3]))
    });
    let err = Pipeline::new(&config, &broken)
        .run(&btc_query(), &RunOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        DataError::Schema(SchemaError::MissingColumn(ref c)) if c == "volume"
    ));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn exchange_local_times_are_stored_sorted_unique_utc() {
    let dir = TempDir::new().unwrap();
    let config = config(dir.path(), StorageFormat::Csv);

    // New York, -05:00: 09:30 local is 14:30 UTC
    let ny = FixedOffset::west_opt(5 * 3600).unwrap();
    let provider = FnProvider(move |_: &str, _: Interval, _: &Resolution| {
        let t = |h: u32, m: u32| RawTimestamp::Zoned(ny.with_ymd_and_hms(2024, 1, 2, h, m, 0).unwrap());
        Ok(RawTable::new()
            .with_timestamps("Datetime", vec![t(10, 30), t(9, 30), t(10, 30)])
            .with_numbers("Open", vec![Some(2.0), Some(1.0), Some(9.0)])
            .with_numbers("High", vec![Some(2.0), Some(1.0), Some(9.0)])
            .with_numbers("Low", vec![Some(2.0), Some(1.0), Some(9.0)])
            .with_numbers("Close", vec![Some(2.0), Some(1.0), Some(9.0)])
            .with_numbers("Volume", vec![Some(20.0), Some(10.0), Some(90.0)]))
    });
    let query = Query::range(
        "SPY",
        Interval::Hour1,
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    )
    .unwrap();

    let report = Pipeline::new(&config, &provider)
        .run(&query, &RunOptions::default())
        .unwrap();

    let stored = store::read(&report.location.unwrap().full_path).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].time, Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap());
    assert_eq!(stored[1].time, Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap());
    assert_eq!(stored[1].open, 2.0, "first occurrence of a duplicate is kept");
}
