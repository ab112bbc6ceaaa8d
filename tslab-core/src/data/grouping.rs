//! Explicit per-ticker grouping of a canonical table.
//!
//! Every grouped statistic in the analytics layer (first differences,
//! breakpoint indices, per-ticker medians) requires ascending time order.
//! The stored table is sorted most-recent-first, so nothing here assumes the
//! table's presentation order: groups are re-sorted ascending at the point of
//! consumption, making the ordering an explicit, auditable choice.

use std::collections::BTreeMap;

use polars::prelude::*;

use super::frame::{dataframe_to_bars, FrameError};
use super::schema::{DATE, TICKER};
use crate::domain::Bar;

/// Fold a canonical table into ticker → bars, each group sorted ascending by
/// timestamp. BTreeMap keys give deterministic ticker-ascending iteration.
pub fn ticker_groups(df: &DataFrame) -> Result<BTreeMap<String, Vec<Bar>>, FrameError> {
    let mut groups: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in dataframe_to_bars(df)? {
        groups.entry(bar.ticker.clone()).or_default().push(bar);
    }
    for bars in groups.values_mut() {
        bars.sort_by_key(|b| b.timestamp);
    }
    Ok(groups)
}

/// Fold a table into ticker → row indices, each group sorted ascending by the
/// Date column. Used where consumers need arbitrary columns (features) rather
/// than OHLCV bars.
pub fn ticker_row_indices(df: &DataFrame) -> Result<BTreeMap<String, Vec<u32>>, FrameError> {
    let tickers = df
        .column(TICKER)
        .and_then(|c| c.str().cloned())
        .map_err(|e| FrameError::Column(format!("{TICKER}: {e}")))?;
    let dates = df
        .column(DATE)
        .map_err(|e| FrameError::Column(e.to_string()))?
        .datetime()
        .map_err(|e| FrameError::Column(format!("{DATE} dtype: {e}")))?
        .clone();

    let mut keyed: BTreeMap<String, Vec<(i64, u32)>> = BTreeMap::new();
    for row in 0..df.height() {
        let ticker = tickers
            .get(row)
            .ok_or(FrameError::NullCell { column: TICKER, row })?;
        let stamp = dates
            .get(row)
            .ok_or(FrameError::NullCell { column: DATE, row })?;
        keyed
            .entry(ticker.to_string())
            .or_default()
            .push((stamp, row as u32));
    }

    let mut groups = BTreeMap::new();
    for (ticker, mut rows) in keyed {
        rows.sort_by_key(|&(stamp, _)| stamp);
        groups.insert(ticker, rows.into_iter().map(|(_, row)| row).collect());
    }
    Ok(groups)
}
