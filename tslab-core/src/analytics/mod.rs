//! Derived-signal analytics over canonical tables.
//!
//! Every operation here is a pure function of its input table: synchronous,
//! single-threaded, no fitted state across calls. Errors are deterministic
//! and typed; nothing is logged or swallowed.

pub mod autocorr;
pub mod changepoint;
pub mod outliers;
pub mod stationarity;
pub mod stats;

pub use changepoint::{segment_kernel, segment_pelt, CostModel, KernelParams, PeltParams};
pub use outliers::{detect_outliers, OutlierParams, OutlierRecord};
pub use stationarity::{check_stationarity, StationarityTest, StationarityVerdict};

use crate::data::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("insufficient data for '{ticker}': need {needed} observations, got {got}")]
    InsufficientData {
        ticker: String,
        needed: usize,
        got: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("frame error: {0}")]
    Frame(String),
}

impl From<FrameError> for AnalyticsError {
    fn from(e: FrameError) -> Self {
        AnalyticsError::Frame(e.to_string())
    }
}
