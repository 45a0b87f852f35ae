//! fohlcv core: download, normalize and store TOHLCV market data.
//!
//! This crate contains everything below the command line:
//! - Domain types (canonical bars, intervals, periods, queries)
//! - Range resolution and the remote chart client
//! - Schema normalization into the canonical six-column table
//! - Deterministic output layout and atomic Parquet/CSV storage
//! - The pipeline that runs one query end to end

pub mod config;
pub mod data;
pub mod domain;
pub mod pipeline;

pub use config::{Config, ConfigError, ProviderConfig};
pub use pipeline::{Pipeline, RunOptions, RunReport};
