//! Bar granularity (`Interval`) and relative lookback (`Period`).
//!
//! Both types parse from and display as the provider's own tokens
//! (`1h`, `1wk`, `60d`, `ytd`, ...), so the same string travels from the
//! command line to the request URL and into the output path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing user-supplied query fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown interval '{0}' (valid: {valid})", valid = Interval::valid_list())]
    UnknownInterval(String),

    #[error("invalid period '{0}' (examples: 5d, 60d, 1wk, 6mo, 1y, ytd, max)")]
    InvalidPeriod(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("unknown format '{0}' (valid: parquet, csv)")]
    UnknownFormat(String),

    #[error("ticker is empty")]
    EmptyTicker,
}

/// Sampling granularity of a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "2m")]
    Minute2,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "60m")]
    Minute60,
    #[serde(rename = "90m")]
    Minute90,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "5d")]
    Day5,
    #[serde(rename = "1wk")]
    Week1,
    #[serde(rename = "1mo")]
    Month1,
    #[serde(rename = "3mo")]
    Month3,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::Minute1,
        Interval::Minute2,
        Interval::Minute5,
        Interval::Minute15,
        Interval::Minute30,
        Interval::Minute60,
        Interval::Minute90,
        Interval::Hour1,
        Interval::Day1,
        Interval::Day5,
        Interval::Week1,
        Interval::Month1,
        Interval::Month3,
    ];

    /// Provider token for this interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute1 => "1m",
            Interval::Minute2 => "2m",
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Minute30 => "30m",
            Interval::Minute60 => "60m",
            Interval::Minute90 => "90m",
            Interval::Hour1 => "1h",
            Interval::Day1 => "1d",
            Interval::Day5 => "5d",
            Interval::Week1 => "1wk",
            Interval::Month1 => "1mo",
            Interval::Month3 => "3mo",
        }
    }

    /// Minute and hour buckets. Providers cap how far back these go.
    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Interval::Minute1
                | Interval::Minute2
                | Interval::Minute5
                | Interval::Minute15
                | Interval::Minute30
                | Interval::Minute60
                | Interval::Minute90
                | Interval::Hour1
        )
    }

    fn valid_list() -> String {
        Self::ALL
            .iter()
            .map(|i| i.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|i| i.as_str() == token)
            .ok_or_else(|| ParseError::UnknownInterval(s.trim().to_string()))
    }
}

/// Relative lookback window, resolved by the provider against "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Days(n) => write!(f, "{n}d"),
            Period::Weeks(n) => write!(f, "{n}wk"),
            Period::Months(n) => write!(f, "{n}mo"),
            Period::Years(n) => write!(f, "{n}y"),
            Period::YearToDate => f.write_str("ytd"),
            Period::Max => f.write_str("max"),
        }
    }
}

impl FromStr for Period {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "ytd" => return Ok(Period::YearToDate),
            "max" => return Ok(Period::Max),
            _ => {}
        }

        let invalid = || ParseError::InvalidPeriod(s.trim().to_string());
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (digits, unit) = token.split_at(split);
        let n: u32 = digits.parse().map_err(|_| invalid())?;
        if n == 0 {
            return Err(invalid());
        }

        match unit {
            "d" => Ok(Period::Days(n)),
            "wk" | "w" => Ok(Period::Weeks(n)),
            "mo" => Ok(Period::Months(n)),
            "y" => Ok(Period::Years(n)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_parses_every_token() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn interval_parse_is_case_insensitive_and_trims() {
        assert_eq!(" 1H ".parse::<Interval>().unwrap(), Interval::Hour1);
        assert_eq!("1WK".parse::<Interval>().unwrap(), Interval::Week1);
    }

    #[test]
    fn unknown_interval_is_rejected() {
        let err = "7m".parse::<Interval>().unwrap_err();
        assert_eq!(err, ParseError::UnknownInterval("7m".into()));
        assert!(err.to_string().contains("1m,2m,5m"));
    }

    #[test]
    fn intraday_classification() {
        assert!(Interval::Minute5.is_intraday());
        assert!(Interval::Hour1.is_intraday());
        assert!(!Interval::Day1.is_intraday());
        assert!(!Interval::Month3.is_intraday());
    }

    #[test]
    fn interval_serde_uses_tokens() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            interval: Interval,
        }
        let parsed: Wrapper = toml::from_str(r#"interval = "15m""#).unwrap();
        assert_eq!(parsed.interval, Interval::Minute15);
        let out = toml::to_string(&parsed).unwrap();
        assert!(out.contains(r#"interval = "15m""#));
    }

    #[test]
    fn period_parses_shorthands() {
        assert_eq!("30d".parse::<Period>().unwrap(), Period::Days(30));
        assert_eq!("1wk".parse::<Period>().unwrap(), Period::Weeks(1));
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::Months(6));
        assert_eq!("1Y".parse::<Period>().unwrap(), Period::Years(1));
        assert_eq!("ytd".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("MAX".parse::<Period>().unwrap(), Period::Max);
    }

    #[test]
    fn period_display_is_canonical() {
        assert_eq!(Period::Days(60).to_string(), "60d");
        assert_eq!("2W".parse::<Period>().unwrap().to_string(), "2wk");
        assert_eq!(Period::YearToDate.to_string(), "ytd");
    }

    #[test]
    fn malformed_periods_are_rejected() {
        for bad in ["", "d", "0d", "10", "3h", "1.5y", "-1d", "yy"] {
            assert!(bad.parse::<Period>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn period_serde_roundtrips_through_string() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            period: Period,
        }
        let parsed: Wrapper = toml::from_str(r#"period = "60d""#).unwrap();
        assert_eq!(parsed.period, Period::Days(60));
        assert!(toml::from_str::<Wrapper>(r#"period = "sixty""#).is_err());
    }
}
