//! DataFrame ⇄ `Vec<Bar>` conversion helpers.

use chrono::{DateTime, Utc};
use polars::prelude::*;

use super::schema::{CLOSE, DATE, HIGH, LOW, OPEN, TICKER, VOLUME};
use crate::domain::Bar;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("column read failed: {0}")]
    Column(String),

    #[error("null {column} at row {row}")]
    NullCell { column: &'static str, row: usize },

    #[error("invalid timestamp at row {row}")]
    BadTimestamp { row: usize },
}

/// Convert bars to a canonical DataFrame (Date/Ticker/OHLC/Volume).
pub fn bars_to_dataframe(bars: &[Bar]) -> Result<DataFrame, FrameError> {
    let stamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_millis()).collect();
    let tickers: Vec<&str> = bars.iter().map(|b| b.ticker.as_str()).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    // NaN volume round-trips as null.
    let volumes: Vec<Option<f64>> = bars
        .iter()
        .map(|b| if b.volume.is_nan() { None } else { Some(b.volume) })
        .collect();

    let date = Column::new(DATE.into(), stamps)
        .cast(&DataType::Datetime(
            TimeUnit::Milliseconds,
            Some("UTC".into()),
        ))
        .map_err(|e| FrameError::Column(format!("date cast: {e}")))?;

    DataFrame::new(vec![
        date,
        Column::new(TICKER.into(), tickers),
        Column::new(OPEN.into(), opens),
        Column::new(HIGH.into(), highs),
        Column::new(LOW.into(), lows),
        Column::new(CLOSE.into(), closes),
        Column::new(VOLUME.into(), volumes),
    ])
    .map_err(|e| FrameError::Column(format!("dataframe creation: {e}")))
}

/// Convert a canonical DataFrame back to bars, in table row order.
///
/// Price and identity columns must be non-null (the cleaner guarantees this);
/// null Volume becomes NaN.
pub fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, FrameError> {
    let dates = datetime_millis(df)?;
    let tickers = str_column(df, TICKER)?;
    let opens = f64_column(df, OPEN)?;
    let highs = f64_column(df, HIGH)?;
    let lows = f64_column(df, LOW)?;
    let closes = f64_column(df, CLOSE)?;
    let volumes = f64_column(df, VOLUME)?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);
    for row in 0..n {
        let ms = dates
            .get(row)
            .ok_or(FrameError::NullCell { column: DATE, row })?;
        let timestamp = DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or(FrameError::BadTimestamp { row })?;
        let ticker = tickers
            .get(row)
            .ok_or(FrameError::NullCell { column: TICKER, row })?;

        bars.push(Bar {
            ticker: ticker.to_string(),
            timestamp,
            open: non_null(&opens, row, OPEN)?,
            high: non_null(&highs, row, HIGH)?,
            low: non_null(&lows, row, LOW)?,
            close: non_null(&closes, row, CLOSE)?,
            volume: volumes.get(row).unwrap_or(f64::NAN),
        });
    }

    Ok(bars)
}

/// Physical millisecond values of the Date column, whatever its time unit.
fn datetime_millis(df: &DataFrame) -> Result<Int64Chunked, FrameError> {
    let column = df
        .column(DATE)
        .map_err(|e| FrameError::Column(e.to_string()))?;
    let ca = column
        .datetime()
        .map_err(|e| FrameError::Column(format!("{DATE} dtype: {e}")))?;
    let factor = match ca.time_unit() {
        TimeUnit::Milliseconds => 1,
        TimeUnit::Microseconds => 1_000,
        TimeUnit::Nanoseconds => 1_000_000,
    };
    let phys: &Int64Chunked = ca;
    Ok(phys.apply_values(|v| v / factor))
}

fn str_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked, FrameError> {
    df.column(name)
        .and_then(|c| c.str())
        .map_err(|e| FrameError::Column(format!("{name}: {e}")))
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Float64Chunked, FrameError> {
    df.column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .and_then(|c| c.f64().cloned())
        .map_err(|e| FrameError::Column(format!("{name}: {e}")))
}

fn non_null(ca: &Float64Chunked, row: usize, column: &'static str) -> Result<f64, FrameError> {
    ca.get(row).ok_or(FrameError::NullCell { column, row })
}
