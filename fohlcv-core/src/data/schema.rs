use crate::domain::bar::{CanonicalBar, TOHLCV_COLUMNS};
use polars::prelude::*;

/// Time zone stored on the `time` column.
pub const UTC: &str = "UTC";

/// Expected schema for persisted TOHLCV tables
pub struct TohlcvSchema;

impl TohlcvSchema {
    /// Get the canonical TOHLCV schema, in column order
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(
                "time".into(),
                DataType::Datetime(TimeUnit::Nanoseconds, Some(UTC.into())),
            ),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::Float64),
        ])
    }

    /// Validate a DataFrame against the schema.
    ///
    /// Column names and order must match exactly. `time` may carry any
    /// datetime unit; the rest must be `Float64`.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            if !actual.contains(field.name()) {
                return Err(SchemaError::MissingColumn(field.name().to_string()));
            }
        }

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        if names != TOHLCV_COLUMNS {
            return Err(SchemaError::ColumnOrder(names));
        }

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            let ok = match field.dtype() {
                DataType::Datetime(_, _) => matches!(actual_dtype, DataType::Datetime(_, _)),
                dtype => actual_dtype == dtype,
            };
            if !ok {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: format!("{:?}", field.dtype()),
                    actual: format!("{actual_dtype:?}"),
                });
            }
        }

        Ok(())
    }
}

/// Check the canonical invariants of a normalized bar sequence:
/// non-empty, strictly increasing `time`, and no price column entirely missing.
pub fn validate_bars(bars: &[CanonicalBar]) -> Result<(), SchemaError> {
    if bars.is_empty() {
        return Err(SchemaError::Empty);
    }

    if let Some(pos) = bars.windows(2).position(|w| w[0].time >= w[1].time) {
        return Err(SchemaError::NotStrictlyIncreasing {
            row: pos + 1,
            time: bars[pos + 1].time.to_rfc3339(),
        });
    }

    let price_columns: [(&str, fn(&CanonicalBar) -> f64); 4] = [
        ("open", |b| b.open),
        ("high", |b| b.high),
        ("low", |b| b.low),
        ("close", |b| b.close),
    ];
    for (name, get) in price_columns {
        if bars.iter().all(|b| get(b).is_nan()) {
            return Err(SchemaError::AllMissing(name.to_string()));
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Columns out of order: {0:?} (expected time, open, high, low, close, volume)")]
    ColumnOrder(Vec<String>),

    #[error("Column {0} is entirely missing")]
    AllMissing(String),

    #[error("Time is not strictly increasing at row {row} ({time})")]
    NotStrictlyIncreasing { row: usize, time: String },

    #[error("Table has no rows")]
    Empty,
}
