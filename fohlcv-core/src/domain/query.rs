//! Query: what the user asked for, independent of how it was entered.

use super::interval::{Interval, ParseError, Period};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single download request.
///
/// Built once per invocation by an entry adapter (command line or wizard).
/// Either both `start` and `end`, or `period`, drives the lookback; the range
/// normalizer rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub ticker: String,
    pub interval: Interval,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub period: Option<Period>,
}

impl Query {
    /// Query over an explicit date range (`end` is the provider's exclusive bound).
    pub fn range(
        ticker: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            ticker: clean_ticker(ticker)?,
            interval,
            start: Some(start),
            end: Some(end),
            period: None,
        })
    }

    /// Query over a relative lookback period.
    pub fn period(ticker: &str, interval: Interval, period: Period) -> Result<Self, ParseError> {
        Ok(Self {
            ticker: clean_ticker(ticker)?,
            interval,
            start: None,
            end: None,
            period: Some(period),
        })
    }

    /// Query with every window field optional, as collected from user input.
    pub fn new(
        ticker: &str,
        interval: Interval,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        period: Option<Period>,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            ticker: clean_ticker(ticker)?,
            interval,
            start,
            end,
            period,
        })
    }

    /// True when either date was supplied.
    pub fn has_dates(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

fn clean_ticker(ticker: &str) -> Result<String, ParseError> {
    let trimmed = ticker.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyTicker);
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ParseError::InvalidDate(s.trim().to_string()))
}
