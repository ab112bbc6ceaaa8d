//! OHLCV outlier detection.
//!
//! Four independent anomaly flags per row, plus their OR:
//! - `price_outlier` — close-over-close return outside a z-band whose mean
//!   and std are pooled across the WHOLE table, all tickers together. This is
//!   a deliberate modeling simplification carried over from the original
//!   thresholds; it mixes scales across tickers.
//! - `range_outlier` — intraday range percentage above a threshold.
//! - `volume_outlier` — robust z-score against the per-ticker volume median
//!   and MAD.
//! - `gap_outlier` — absolute open-over-prior-open change above a threshold.
//!
//! Returns and gaps are first differences within each ticker's ascending
//! series: the first row of each ticker has NaN return/gap and both derived
//! flags false; the row itself is kept.
//!
//! Edge policies: an undefined z-band (return std of 0 or NaN) flags
//! nothing; a zero volume MAD flags any volume different from the median;
//! NaN volume is never a volume outlier.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;

use super::stats::{mad, mean, median, sample_std};
use super::AnalyticsError;
use crate::data::ticker_groups;

/// Consistency scale factor relating MAD to the standard deviation of a
/// normal distribution.
const MAD_SCALE: f64 = 0.6745;

/// Caller-configurable thresholds. Defaults match the original service.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierParams {
    /// z-band half-width for the pooled return flag.
    pub price_z: f64,
    /// Intraday range threshold, in percent of the low.
    pub range_threshold: f64,
    /// Robust z-score threshold for volume.
    pub volume_mad: f64,
    /// Absolute gap threshold (0.2 == 20%).
    pub gap_threshold: f64,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            price_z: 3.0,
            range_threshold: 20.0,
            volume_mad: 6.0,
            gap_threshold: 0.2,
        }
    }
}

/// A bar extended with derived fields and anomaly flags.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierRecord {
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Close-over-close pct change within the ticker; NaN on the first row.
    pub ret: f64,
    /// (high - low) / low * 100.
    pub range_pct: f64,
    /// Open-over-prior-open pct change within the ticker; NaN on the first row.
    pub gap: f64,
    pub price_outlier: bool,
    pub range_outlier: bool,
    pub volume_outlier: bool,
    pub gap_outlier: bool,
    pub any_outlier: bool,
}

/// Detect outliers over a canonical table. Pure: no state survives the call.
///
/// Output rows are ordered ticker ascending, timestamp ascending.
pub fn detect_outliers(
    df: &DataFrame,
    params: &OutlierParams,
) -> Result<Vec<OutlierRecord>, AnalyticsError> {
    let groups = ticker_groups(df)?;

    // First pass: derived fields per ticker, pooled return collection.
    struct Partial {
        ticker: String,
        index: usize,
        ret: f64,
        gap: f64,
    }
    let mut partials: Vec<Partial> = Vec::with_capacity(df.height());
    let mut pooled_returns: Vec<f64> = Vec::new();

    for (ticker, bars) in &groups {
        for (i, bar) in bars.iter().enumerate() {
            let (ret, gap) = if i == 0 {
                (f64::NAN, f64::NAN)
            } else {
                let prev = &bars[i - 1];
                (bar.close / prev.close - 1.0, bar.open / prev.open - 1.0)
            };
            if !ret.is_nan() {
                pooled_returns.push(ret);
            }
            partials.push(Partial {
                ticker: ticker.clone(),
                index: i,
                ret,
                gap,
            });
        }
    }

    // Pooled z-band across all tickers. Undefined band flags nothing.
    let mean_ret = mean(&pooled_returns);
    let std_ret = sample_std(&pooled_returns);
    let band = if std_ret.is_finite() && std_ret > 0.0 {
        Some((
            mean_ret - params.price_z * std_ret,
            mean_ret + params.price_z * std_ret,
        ))
    } else {
        None
    };

    // Per-ticker volume statistics.
    let mut volume_stats = std::collections::BTreeMap::new();
    for (ticker, bars) in &groups {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        volume_stats.insert(ticker.clone(), (median(&volumes), mad(&volumes)));
    }

    let mut records = Vec::with_capacity(partials.len());
    for partial in partials {
        let bars = &groups[&partial.ticker];
        let bar = &bars[partial.index];
        let (med_vol, mad_vol) = volume_stats[&partial.ticker];

        let price_outlier = match band {
            Some((lo, hi)) => partial.ret < lo || partial.ret > hi,
            None => false,
        };
        let range_pct = bar.range_pct();
        let range_outlier = range_pct > params.range_threshold;
        let volume_outlier = if bar.volume.is_nan() || med_vol.is_nan() {
            false
        } else if mad_vol == 0.0 {
            bar.volume != med_vol
        } else {
            (MAD_SCALE * (bar.volume - med_vol) / mad_vol).abs() > params.volume_mad
        };
        let gap_outlier = partial.gap.abs() > params.gap_threshold;

        records.push(OutlierRecord {
            ticker: bar.ticker.clone(),
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            ret: partial.ret,
            range_pct,
            gap: partial.gap,
            price_outlier,
            range_outlier,
            volume_outlier,
            gap_outlier,
            any_outlier: price_outlier || range_outlier || volume_outlier || gap_outlier,
        });
    }

    Ok(records)
}
