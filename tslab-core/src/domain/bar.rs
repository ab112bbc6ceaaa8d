//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single ticker at a single timestamp.
///
/// Timestamps are timezone-aware UTC instants. Volume may be NaN: the cleaner
/// tolerates missing volume, and NaN is the in-memory representation of a
/// null Volume cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC price is NaN.
    pub fn has_void_price(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// The five OHLC consistency inequalities the cleaner enforces.
    pub fn is_sane(&self) -> bool {
        if self.has_void_price() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Intraday range as a percentage of the low.
    pub fn range_pct(&self) -> f64 {
        (self.high - self.low) / self.low * 100.0
    }
}
