//! Command-line adapter: flags → `Config` overrides, `Query` and `RunOptions`.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use fohlcv_core::data::StorageFormat;
use fohlcv_core::domain::{parse_date, Interval, ParseError, Period, Query};
use fohlcv_core::{Config, RunOptions};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "fohlcv",
    version,
    about = "Download TOHLCV bars from Yahoo Finance and store them as Parquet or CSV"
)]
pub struct Cli {
    /// Interactive mode. Also used when no ticker is given.
    #[arg(long, default_value_t = false)]
    pub wizard: bool,

    /// Yahoo ticker (e.g., AAPL, BTC-USD, ^GSPC, EURUSD=X).
    #[arg(long)]
    pub ticker: Option<String>,

    /// Bar interval: 1m,2m,5m,15m,30m,60m,90m,1h,1d,5d,1wk,1mo,3mo. Defaults to the config value (1h).
    #[arg(long)]
    pub interval: Option<Interval>,

    /// Start date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD), exclusive.
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Lookback period (e.g., 60d, 1y, max). Ignored when start/end are given.
    #[arg(long)]
    pub period: Option<Period>,

    /// Output format: parquet or csv.
    #[arg(long)]
    pub format: Option<StorageFormat>,

    /// Exact output file. Its extension picks the format.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Only print the summary, write nothing.
    #[arg(long, default_value_t = false)]
    pub no_save: bool,

    /// Adjust prices for splits and dividends.
    #[arg(long, default_value_t = false)]
    pub auto_adjust: bool,

    /// Include pre- and after-market bars.
    #[arg(long, default_value_t = false)]
    pub prepost: bool,

    /// Path to a TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output root. Overrides the config value.
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace). Falls back to RUST_LOG, then warn.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file (or defaults) and apply flag overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        Ok(config)
    }

    /// Whether to collect the query interactively.
    pub fn use_wizard(&self) -> bool {
        self.wizard
            || self
                .ticker
                .as_deref()
                .map_or(true, |t| t.trim().is_empty())
    }

    /// Query from flags. Without dates the period falls back to the configured default.
    pub fn to_query(&self, config: &Config) -> Result<Query, ParseError> {
        let has_dates = self.start.is_some() || self.end.is_some();
        let period = if has_dates {
            self.period
        } else {
            Some(self.period.unwrap_or(config.default_period))
        };

        Query::new(
            self.ticker.as_deref().unwrap_or_default(),
            self.interval.unwrap_or(config.default_interval),
            self.start,
            self.end,
            period,
        )
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            save: !self.no_save,
            out: self.out.clone(),
        }
    }
}
