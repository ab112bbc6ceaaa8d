//! Market-data provider trait and structured error types.
//!
//! The BarProvider trait abstracts over vendor APIs so the update pipeline
//! can swap implementations and mock for tests. Rate limiting is the
//! pipeline's concern (fixed pacing between calls), not the provider's.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Interval;

/// Raw OHLCV bar from a provider, before normalization. No ticker: the
/// pipeline attaches it when building canonical rows.
#[derive(Debug, Clone)]
pub struct ProviderBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Structured error types for provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("provider error: {0}")]
    Other(String),
}

/// Trait for market-data providers.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch OHLCV bars for one ticker over a time range at an interval.
    fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderBar>, ProviderError>;
}

/// Progress callback for multi-ticker update runs.
pub trait UpdateProgress: Send {
    /// Called when starting to fetch a ticker for an interval.
    fn on_ticker_start(&self, ticker: &str, interval: Interval, index: usize, total: usize);

    /// Called when a ticker's fetch windows are done. `result` carries the
    /// number of raw rows fetched, or the last error encountered.
    fn on_ticker_complete(
        &self,
        ticker: &str,
        interval: Interval,
        result: &Result<usize, ProviderError>,
    );

    /// Called after an interval's store has been merged and rewritten.
    fn on_interval_complete(&self, interval: Interval, rows_added: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl UpdateProgress for StdoutProgress {
    fn on_ticker_start(&self, ticker: &str, interval: Interval, index: usize, total: usize) {
        println!("[{}/{}] {interval} {ticker}...", index + 1, total);
    }

    fn on_ticker_complete(
        &self,
        ticker: &str,
        interval: Interval,
        result: &Result<usize, ProviderError>,
    ) {
        match result {
            Ok(rows) => println!("  OK: {ticker} ({interval}): {rows} rows"),
            Err(e) => println!("  FAIL: {ticker} ({interval}): {e}"),
        }
    }

    fn on_interval_complete(&self, interval: Interval, rows_added: usize) {
        if rows_added > 0 {
            println!("[{interval}] added {rows_added} rows");
        } else {
            println!("[{interval}] no new data");
        }
    }
}

/// Progress reporter that swallows everything (tests, embedding).
pub struct SilentProgress;

impl UpdateProgress for SilentProgress {
    fn on_ticker_start(&self, _: &str, _: Interval, _: usize, _: usize) {}
    fn on_ticker_complete(&self, _: &str, _: Interval, _: &Result<usize, ProviderError>) {}
    fn on_interval_complete(&self, _: Interval, _: usize) {}
}
