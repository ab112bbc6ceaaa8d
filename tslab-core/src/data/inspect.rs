//! Data-quality inspection of the interval stores.
//!
//! Reports duplicate (Ticker, Date) keys and timestamp irregularities per
//! ticker. Intraday series tolerate the overnight session gap (up to 20h);
//! daily series flag gaps beyond 4 days (weekend plus a holiday); weekly
//! series expect steps of 6–8 days. No exchange calendar is consulted, so
//! the daily check is a heuristic, not an authoritative missing-day list.

use std::collections::HashSet;

use chrono::Duration;
use polars::prelude::*;

use super::frame::FrameError;
use super::grouping::ticker_groups;
use crate::domain::Interval;

/// Quality report for one interval's table.
#[derive(Debug)]
pub struct IntervalReport {
    pub interval: Interval,
    pub rows: usize,
    pub duplicate_keys: usize,
    pub tickers: Vec<TickerReport>,
}

/// Per-ticker step irregularities.
#[derive(Debug)]
pub struct TickerReport {
    pub ticker: String,
    pub bars: usize,
    pub irregular_steps: usize,
    /// Largest step between consecutive bars, in hours.
    pub max_step_hours: i64,
}

impl IntervalReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_keys == 0 && self.tickers.iter().all(|t| t.irregular_steps == 0)
    }
}

/// Inspect one interval's table.
pub fn inspect_interval(df: &DataFrame, interval: Interval) -> Result<IntervalReport, FrameError> {
    let groups = ticker_groups(df)?;

    let mut seen = HashSet::new();
    let mut duplicate_keys = 0usize;
    for bars in groups.values() {
        for bar in bars {
            if !seen.insert((bar.ticker.clone(), bar.timestamp)) {
                duplicate_keys += 1;
            }
        }
    }

    let mut tickers = Vec::with_capacity(groups.len());
    for (ticker, bars) in &groups {
        let mut irregular_steps = 0usize;
        let mut max_step_hours = 0i64;
        for pair in bars.windows(2) {
            let step = pair[1].timestamp - pair[0].timestamp;
            max_step_hours = max_step_hours.max(step.num_hours());
            if is_irregular(interval, step) {
                irregular_steps += 1;
            }
        }
        tickers.push(TickerReport {
            ticker: ticker.clone(),
            bars: bars.len(),
            irregular_steps,
            max_step_hours,
        });
    }

    Ok(IntervalReport {
        interval,
        rows: df.height(),
        duplicate_keys,
        tickers,
    })
}

fn is_irregular(interval: Interval, step: Duration) -> bool {
    if interval.is_intraday() {
        // Overnight plus margin; anything larger is a hole in the session data.
        step > Duration::hours(20)
    } else if interval == Interval::D1 {
        step > Duration::days(4)
    } else {
        step < Duration::days(6) || step > Duration::days(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::bars_to_dataframe;
    use crate::domain::Bar;
    use chrono::{TimeZone, Utc};

    fn daily_bar(day: u32, close: f64) -> Bar {
        Bar {
            ticker: "AAPL".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn contiguous_daily_series_is_clean() {
        let bars: Vec<Bar> = (2..=10).map(|d| daily_bar(d, 100.0 + d as f64)).collect();
        let df = bars_to_dataframe(&bars).unwrap();

        let report = inspect_interval(&df, Interval::D1).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.rows, 9);
        assert_eq!(report.tickers.len(), 1);
    }

    #[test]
    fn daily_hole_is_flagged() {
        // Jump from Jan 2 to Jan 15.
        let bars = vec![daily_bar(2, 100.0), daily_bar(15, 101.0)];
        let df = bars_to_dataframe(&bars).unwrap();

        let report = inspect_interval(&df, Interval::D1).unwrap();
        assert_eq!(report.tickers[0].irregular_steps, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn weekly_step_bounds() {
        let mk = |day: u32| Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            ..daily_bar(1, 100.0)
        };
        // 7-day step then a 3-day step.
        let bars = vec![mk(1), mk(8), mk(11)];
        let df = bars_to_dataframe(&bars).unwrap();

        let report = inspect_interval(&df, Interval::W1).unwrap();
        assert_eq!(report.tickers[0].irregular_steps, 1);
    }

    #[test]
    fn duplicates_counted() {
        let bars = vec![daily_bar(2, 100.0), daily_bar(2, 100.5), daily_bar(3, 101.0)];
        let df = bars_to_dataframe(&bars).unwrap();

        let report = inspect_interval(&df, Interval::D1).unwrap();
        assert_eq!(report.duplicate_keys, 1);
    }
}
