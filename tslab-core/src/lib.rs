//! tslab core — time-series analytics over OHLCV bars.
//!
//! This crate contains the data-integrity and derived-signal pipeline:
//! - Domain types (bars, sampling intervals)
//! - Canonical-table cleaning, per-interval parquet store, ingestion pipeline
//! - Outlier detection (return / range / volume / gap flags)
//! - Changepoint segmentation (kernel fixed-count and penalized exact)
//! - Stationarity tests (ADF / KPSS) and autocorrelation
//! - Baseline forecast dispatch
//!
//! Everything analytic is a pure function of its input table: synchronous,
//! single-threaded, stateless across calls.

pub mod analytics;
pub mod data;
pub mod domain;
pub mod forecast;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: result and config types cross thread boundaries.
    ///
    /// The surrounding service handles requests on worker threads; these
    /// types are handed across them.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Interval>();
        require_sync::<domain::Interval>();

        require_send::<analytics::OutlierParams>();
        require_sync::<analytics::OutlierParams>();
        require_send::<analytics::OutlierRecord>();
        require_sync::<analytics::OutlierRecord>();
        require_send::<analytics::KernelParams>();
        require_sync::<analytics::KernelParams>();
        require_send::<analytics::PeltParams>();
        require_sync::<analytics::PeltParams>();
        require_send::<analytics::StationarityVerdict>();
        require_sync::<analytics::StationarityVerdict>();
        require_send::<analytics::AnalyticsError>();
        require_sync::<analytics::AnalyticsError>();

        require_send::<data::StoreError>();
        require_sync::<data::StoreError>();
        require_send::<data::TableStore>();
        require_sync::<data::TableStore>();

        require_send::<forecast::ForecastPoint>();
        require_sync::<forecast::ForecastPoint>();
    }
}
