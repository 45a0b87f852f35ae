//! Range normalizer: turns user start/end/period into what the provider is sent.
//!
//! The provider treats `end` as exclusive, so a range with `start == end`
//! would return zero rows. That single case is widened to one day; every
//! other valid range passes through untouched.

use super::provider::DataError;
use crate::domain::Period;
use chrono::{Days, NaiveDate};
use tracing::warn;

/// Explicit date window sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: NaiveDate,
    /// Exclusive upper bound. Always after `start`.
    pub end: NaiveDate,
    /// True when `end` was moved forward from an equal start/end pair.
    pub adjusted: bool,
}

/// The single lookback path chosen for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Range(ResolvedRange),
    /// Lookback delegated to the provider's native period semantics.
    Period(Period),
}

impl Resolution {
    pub fn as_range(&self) -> Option<&ResolvedRange> {
        match self {
            Resolution::Range(r) => Some(r),
            Resolution::Period(_) => None,
        }
    }
}

/// Resolve the lookback window.
///
/// Explicit dates win over a period when both are present. Fails with
/// `DataError::InvalidRange` when only one date is given, when nothing is
/// given, or when `start > end`.
pub fn resolve(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    period: Option<Period>,
) -> Result<Resolution, DataError> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if let Some(p) = period {
                warn!(period = %p, "explicit start/end given, ignoring period");
            }
            resolve_dates(start, end).map(Resolution::Range)
        }
        (Some(start), None) => Err(DataError::InvalidRange(format!(
            "start {start} given without an end date"
        ))),
        (None, Some(end)) => Err(DataError::InvalidRange(format!(
            "end {end} given without a start date"
        ))),
        (None, None) => period.map(Resolution::Period).ok_or_else(|| {
            DataError::InvalidRange("either start and end, or a period, is required".into())
        }),
    }
}

fn resolve_dates(start: NaiveDate, end: NaiveDate) -> Result<ResolvedRange, DataError> {
    if start > end {
        return Err(DataError::InvalidRange(format!(
            "start {start} is after end {end}"
        )));
    }

    if start == end {
        let next = start.checked_add_days(Days::new(1)).ok_or_else(|| {
            DataError::InvalidRange(format!("cannot extend end past {start}"))
        })?;
        warn!(%start, end = %next, "start equals end, extending end by one day");
        return Ok(ResolvedRange {
            start,
            end: next,
            adjusted: true,
        });
    }

    Ok(ResolvedRange {
        start,
        end,
        adjusted: false,
    })
}
