//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over the remote source so the pipeline can
//! be driven by an in-memory provider in tests. Every failure of the pipeline
//! surfaces as one `DataError` variant.

use super::range::Resolution;
use super::raw::RawTable;
use super::schema::SchemaError;
use crate::domain::Interval;
use thiserror::Error;

/// Pipeline error taxonomy.
///
/// None of these are retried; each aborts the current invocation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("no data returned for {ticker} (interval={interval}): {reason}")]
    NoData {
        ticker: String,
        interval: Interval,
        reason: String,
    },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Transport, authentication and response-shape failures of the remote API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("request blocked by provider (HTTP 403)")]
    Forbidden,

    #[error("HTTP {status} for {ticker}")]
    Http { status: u16, ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("client setup failed: {0}")]
    Client(String),
}

/// A remote source of TOHLCV tables.
///
/// One call performs one request; implementations do not retry and do not
/// touch local state.
pub trait DataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the provider-native table for `ticker` at `interval` over `window`.
    ///
    /// An empty result is `DataError::NoData`, never an empty table.
    fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        window: &Resolution,
    ) -> Result<RawTable, DataError>;
}
