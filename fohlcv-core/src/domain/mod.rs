//! Domain types for fohlcv: bars, intervals, periods, queries.

pub mod bar;
pub mod interval;
pub mod query;

pub use bar::CanonicalBar;
pub use interval::{Interval, ParseError, Period};
pub use query::{parse_date, Query};
