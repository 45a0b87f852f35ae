//! Provider-native table, before column selection and UTC coercion.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// A timestamp as the provider delivered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTimestamp {
    /// Carries an offset (exchange-local or UTC).
    Zoned(DateTime<FixedOffset>),
    /// No timezone information; taken as UTC.
    Naive(NaiveDateTime),
}

impl RawTimestamp {
    /// UTC instant of this timestamp. Naive values are read as UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            RawTimestamp::Zoned(dt) => dt.with_timezone(&Utc),
            RawTimestamp::Naive(naive) => Utc.from_utc_datetime(naive),
        }
    }
}

/// Cell storage of one column.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValues {
    Timestamps(Vec<RawTimestamp>),
    Numbers(Vec<Option<f64>>),
}

impl RawValues {
    pub fn len(&self) -> usize {
        match self {
            RawValues::Timestamps(v) => v.len(),
            RawValues::Numbers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            RawValues::Timestamps(_) => "timestamp",
            RawValues::Numbers(_) => "number",
        }
    }
}

/// A named column, with whatever name and casing the provider used.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: RawValues,
}

/// Provider result: an ordered set of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<RawColumn>,
}

impl RawTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamp column.
    pub fn with_timestamps(mut self, name: &str, values: Vec<RawTimestamp>) -> Self {
        self.columns.push(RawColumn {
            name: name.to_string(),
            values: RawValues::Timestamps(values),
        });
        self
    }

    /// Append a numeric column.
    pub fn with_numbers(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.columns.push(RawColumn {
            name: name.to_string(),
            values: RawValues::Numbers(values),
        });
        self
    }

    pub fn columns(&self) -> &[RawColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Row count, taken as the longest column.
    pub fn height(&self) -> usize {
        self.columns.iter().map(|c| c.values.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub(crate) fn into_columns(self) -> Vec<RawColumn> {
        self.columns
    }
}
