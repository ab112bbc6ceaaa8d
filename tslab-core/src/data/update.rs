//! Ingestion pipeline: incremental update of the interval stores.
//!
//! For each interval × ticker the updater resumes from the last stored bar
//! (or `step_days` back for a cold start), fetches forward in `step_days`
//! windows with fixed pacing between calls, normalizes rows to the canonical
//! schema, and merges: concat + dedup-keep-last + canonical sort, then a
//! full-overwrite store write. Provider failures skip the window and are
//! recorded in the summary; they never abort the run.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use polars::prelude::*;

use super::clean::{dedup_sort, Cleaner};
use super::frame::{bars_to_dataframe, FrameError};
use super::grouping::ticker_groups;
use super::provider::{BarProvider, ProviderError, UpdateProgress};
use super::store::{StoreError, TableStore};
use crate::domain::{Bar, Interval};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("merge failed: {0}")]
    Merge(String),

    #[error("clean failed: {0}")]
    Clean(String),
}

impl From<FrameError> for PipelineError {
    fn from(e: FrameError) -> Self {
        PipelineError::Frame(e.to_string())
    }
}

/// Outcome of updating one interval store.
#[derive(Debug)]
pub struct IntervalOutcome {
    pub interval: Interval,
    pub rows_added: usize,
    /// Last provider error per ticker that had one.
    pub errors: Vec<(String, ProviderError)>,
}

/// Summary of a full update run.
#[derive(Debug)]
pub struct UpdateSummary {
    pub intervals: Vec<Result<IntervalOutcome, PipelineError>>,
}

impl UpdateSummary {
    pub fn all_succeeded(&self) -> bool {
        self.intervals
            .iter()
            .all(|r| matches!(r, Ok(outcome) if outcome.errors.is_empty()))
    }
}

/// The update pipeline.
pub struct Updater<'a> {
    provider: &'a dyn BarProvider,
    store: &'a TableStore,
    pace: StdDuration,
}

impl<'a> Updater<'a> {
    /// `pace` is the fixed sleep between provider calls (vendor rate limit).
    pub fn new(provider: &'a dyn BarProvider, store: &'a TableStore, pace: StdDuration) -> Self {
        Self {
            provider,
            store,
            pace,
        }
    }

    /// Update every interval store, then clean each one.
    pub fn update_all(&self, tickers: &[String], progress: &dyn UpdateProgress) -> UpdateSummary {
        let mut intervals = Vec::with_capacity(Interval::ALL.len());
        for interval in Interval::ALL {
            intervals.push(self.update_interval(interval, tickers, progress));
        }

        for outcome in clean_all(self.store) {
            if let Err(e) = outcome.result {
                eprintln!("WARNING: clean {} failed: {e}", outcome.interval);
            }
        }

        UpdateSummary { intervals }
    }

    /// Update one interval store.
    pub fn update_interval(
        &self,
        interval: Interval,
        tickers: &[String],
        progress: &dyn UpdateProgress,
    ) -> Result<IntervalOutcome, PipelineError> {
        let existing = match self.store.read(interval) {
            Ok(df) => df,
            Err(StoreError::NotFound { .. }) => bars_to_dataframe(&[])?,
            Err(e) => return Err(e.into()),
        };
        let groups = ticker_groups(&existing)?;

        let now = Utc::now();
        let step = Duration::days(interval.step_days());
        let total = tickers.len();
        let mut new_bars: Vec<Bar> = Vec::new();
        let mut errors = Vec::new();

        for (index, ticker) in tickers.iter().enumerate() {
            progress.on_ticker_start(ticker, interval, index, total);

            let last = groups
                .get(ticker)
                .and_then(|bars| bars.last())
                .map(|b| b.timestamp);
            let mut start = match last {
                Some(t) => t + Duration::minutes(1),
                None => now - step,
            };

            let mut fetched = 0usize;
            let mut last_error: Option<ProviderError> = None;

            while start < now {
                let end = (start + step).min(now);

                match self.provider.fetch(ticker, interval, start, end) {
                    Ok(bars) => {
                        fetched += bars.len();
                        for pb in bars {
                            new_bars.push(Bar {
                                ticker: ticker.clone(),
                                timestamp: pb.timestamp,
                                open: pb.open,
                                high: pb.high,
                                low: pb.low,
                                close: pb.close,
                                volume: pb.volume.unwrap_or(f64::NAN),
                            });
                        }
                    }
                    Err(e) => {
                        // Skip this window; the next run will retry it.
                        last_error = Some(e);
                        std::thread::sleep(StdDuration::from_secs(2).min(self.pace));
                    }
                }

                std::thread::sleep(self.pace);
                start = end;
            }

            let result = match last_error {
                Some(e) => Err(e),
                None => Ok(fetched),
            };
            progress.on_ticker_complete(ticker, interval, &result);
            if let Err(e) = result {
                errors.push((ticker.clone(), e));
            }
        }

        let rows_added = if new_bars.is_empty() {
            0
        } else {
            let before = existing.height();
            let merged = merge(existing, &new_bars)?;
            let added = merged.height().saturating_sub(before);
            self.store.write(interval, &merged)?;
            added
        };

        progress.on_interval_complete(interval, rows_added);
        Ok(IntervalOutcome {
            interval,
            rows_added,
            errors,
        })
    }
}

/// Concat new bars onto the existing table, dedup keep-last, canonical sort.
fn merge(existing: DataFrame, new_bars: &[Bar]) -> Result<DataFrame, PipelineError> {
    let new_df = bars_to_dataframe(new_bars)?;
    let stacked = existing
        .vstack(&new_df)
        .map_err(|e| PipelineError::Merge(e.to_string()))?;
    dedup_sort(stacked.lazy())
        .collect()
        .map_err(|e| PipelineError::Merge(e.to_string()))
}

/// Outcome of cleaning one interval store in place.
#[derive(Debug)]
pub struct CleanOutcome {
    pub interval: Interval,
    /// (rows before, rows after) on success.
    pub result: Result<(usize, usize), PipelineError>,
}

/// Run the cleaner over every existing interval store, rewriting in place.
pub fn clean_all(store: &TableStore) -> Vec<CleanOutcome> {
    let mut outcomes = Vec::new();
    for interval in Interval::ALL {
        if !store.exists(interval) {
            continue;
        }
        let result = clean_one(store, interval);
        outcomes.push(CleanOutcome { interval, result });
    }
    outcomes
}

fn clean_one(store: &TableStore, interval: Interval) -> Result<(usize, usize), PipelineError> {
    let df = store.read(interval)?;
    let before = df.height();
    let cleaned = Cleaner::clean(df).map_err(|e| PipelineError::Clean(e.to_string()))?;
    let after = cleaned.height();
    store.write(interval, &cleaned)?;
    Ok((before, after))
}
