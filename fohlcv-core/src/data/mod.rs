//! Data acquisition, normalization and storage

pub mod canonicalize;
pub mod layout;
pub mod provider;
pub mod range;
pub mod raw;
pub mod schema;
pub mod store;
pub mod yahoo;

pub use canonicalize::{normalize, Canonicalizer};
pub use layout::{build_path, build_path_for_range, sanitize_token, OutputLocation};
pub use provider::{DataError, DataProvider, ProviderError};
pub use range::{resolve, Resolution, ResolvedRange};
pub use raw::{RawColumn, RawTable, RawTimestamp, RawValues};
pub use schema::{validate_bars, SchemaError, TohlcvSchema};
pub use store::StorageFormat;
pub use yahoo::YahooProvider;
