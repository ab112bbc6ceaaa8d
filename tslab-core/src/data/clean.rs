//! Schema validation and cleaning of raw OHLCV tables.
//!
//! `Cleaner::clean` enforces the canonical contract on any ingested table:
//! coerce types (unparseable cells become null), drop incomplete rows, keep
//! only rows satisfying the five OHLC inequalities, dedup on (Ticker, Date)
//! keeping the last-seen row, and sort Ticker ascending / Date descending.
//!
//! The descending Date order is the presentation contract of the stored
//! table. Consumers that need ascending time order (first differences,
//! breakpoint indices) must not assume it; they re-sort per ticker through
//! `data::grouping`.

use polars::prelude::*;

use super::schema::{BarSchema, SchemaError, CLOSE, DATE, HIGH, LOW, OPEN, TICKER, VOLUME};

/// Cleaner for raw bar tables.
pub struct Cleaner;

impl Cleaner {
    /// Clean one OHLCV table into canonical form.
    ///
    /// Fails only on missing required columns or a compute error; an empty
    /// result is a valid (degenerate) output. Idempotent: cleaning a cleaned
    /// table is a no-op.
    pub fn clean(df: DataFrame) -> Result<DataFrame, SchemaError> {
        BarSchema::require_columns(&df)?;

        let date_dtype = df
            .schema()
            .get(DATE)
            .cloned()
            .unwrap_or(DataType::Null);

        let mut coercions = vec![date_to_utc(&date_dtype), col(TICKER).cast(DataType::String)];
        for name in [OPEN, HIGH, LOW, CLOSE, VOLUME] {
            // Non-strict cast: unparseable values become null.
            coercions.push(col(name).cast(DataType::Float64));
        }

        let lf = df
            .lazy()
            .with_columns(coercions)
            // Volume nulls are tolerated at this stage.
            .drop_nulls(Some(vec![
                col(DATE),
                col(TICKER),
                col(OPEN),
                col(HIGH),
                col(LOW),
                col(CLOSE),
            ]))
            .filter(
                col(HIGH)
                    .gt_eq(col(LOW))
                    .and(col(HIGH).gt_eq(col(OPEN)))
                    .and(col(HIGH).gt_eq(col(CLOSE)))
                    .and(col(LOW).lt_eq(col(OPEN)))
                    .and(col(LOW).lt_eq(col(CLOSE))),
            );

        dedup_sort(lf)
            .collect()
            .map_err(|e| SchemaError::Compute(e.to_string()))
    }
}

/// Dedup on (Ticker, Date) keeping the last-seen row (later ingestion wins),
/// then sort Ticker ascending, Date descending. Shared by the cleaner and the
/// ingestion merge.
pub(crate) fn dedup_sort(lf: LazyFrame) -> LazyFrame {
    lf.unique_stable(
        Some(vec![TICKER.into(), DATE.into()]),
        UniqueKeepStrategy::Last,
    )
    .sort(
        [TICKER, DATE],
        SortMultipleOptions::default()
            .with_order_descending_multi([false, true])
            .with_maintain_order(true),
    )
}

/// Coercion of the Date column to Datetime[ms, UTC], by source dtype.
/// Unparseable values become null and are dropped downstream.
fn date_to_utc(dtype: &DataType) -> Expr {
    let canonical = BarSchema::date_dtype();
    match dtype {
        DataType::String => col(DATE).str().to_datetime(
            Some(TimeUnit::Milliseconds),
            Some("UTC".into()),
            StrptimeOptions {
                strict: false,
                ..Default::default()
            },
            lit("raise"),
        ),
        DataType::Datetime(_, Some(_)) => col(DATE)
            .dt()
            .convert_time_zone("UTC".into())
            .cast(canonical),
        DataType::Datetime(_, None) => col(DATE)
            .dt()
            .replace_time_zone(Some("UTC".into()), lit("raise"), NonExistent::Raise)
            .cast(canonical),
        DataType::Date => col(DATE)
            .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
            .dt()
            .replace_time_zone(Some("UTC".into()), lit("raise"), NonExistent::Raise),
        // Any other dtype cannot represent an instant: null the column so the
        // rows are dropped downstream.
        _ => lit(NULL).cast(canonical).alias(DATE),
    }
}
