//! Canonical table schema contract.
//!
//! Every interval store carries the same seven columns:
//! `Date` (Datetime[ms, UTC]), `Ticker` (String), `Open`/`High`/`Low`/`Close`
//! (Float64), `Volume` (Float64). This layout is the interoperability
//! contract with the surrounding service; any storage format must honor it
//! bit-exactly.

use polars::prelude::*;

pub const DATE: &str = "Date";
pub const TICKER: &str = "Ticker";
pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";

/// Required columns of any table entering the cleaner.
pub const REQUIRED_COLUMNS: [&str; 7] = [DATE, TICKER, OPEN, HIGH, LOW, CLOSE, VOLUME];

/// Price columns (null in any of these drops the row).
pub const PRICE_COLUMNS: [&str; 4] = [OPEN, HIGH, LOW, CLOSE];

/// Expected schema for canonical bar data.
pub struct BarSchema;

impl BarSchema {
    /// The canonical bar schema.
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(
                DATE.into(),
                DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into())),
            ),
            Field::new(TICKER.into(), DataType::String),
            Field::new(OPEN.into(), DataType::Float64),
            Field::new(HIGH.into(), DataType::Float64),
            Field::new(LOW.into(), DataType::Float64),
            Field::new(CLOSE.into(), DataType::Float64),
            Field::new(VOLUME.into(), DataType::Float64),
        ])
    }

    /// The canonical Date dtype.
    pub fn date_dtype() -> DataType {
        DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into()))
    }

    /// Check that every required column is present. Types are not checked
    /// here: the cleaner coerces them.
    pub fn require_columns(df: &DataFrame) -> Result<(), SchemaError> {
        let actual = df.schema();
        for name in REQUIRED_COLUMNS {
            if !actual.contains(name) {
                return Err(SchemaError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("cleaning failed: {0}")]
    Compute(String),
}
