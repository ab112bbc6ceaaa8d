//! Unit-root and stationarity hypothesis tests per (ticker, feature) pair.
//!
//! - ADF: null hypothesis "has a unit root" (non-stationary); classified
//!   stationary when `p_value < alpha`.
//! - KPSS: null hypothesis "stationary"; classified stationary when
//!   `p_value > alpha`. The inverted polarity relative to ADF is intentional
//!   and preserved.
//!
//! Pairs with fewer than `MIN_OBSERVATIONS` non-null values are silently
//! skipped, as are pairs whose regression is degenerate (constant series).
//! p-values are piecewise interpolations through the published critical
//! values, not full response surfaces: verdicts at conventional alphas are
//! reliable, the later digits are not.

use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use polars::prelude::*;
use serde::Serialize;

use super::stats::mean;
use super::AnalyticsError;
use crate::data::schema::{DATE, TICKER};
use crate::data::ticker_row_indices;

/// Minimum non-null observations for a (ticker, feature) pair to be tested.
pub const MIN_OBSERVATIONS: usize = 10;

/// Which hypothesis test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationarityTest {
    Adf,
    Kpss,
}

impl StationarityTest {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationarityTest::Adf => "ADF",
            StationarityTest::Kpss => "KPSS",
        }
    }
}

impl FromStr for StationarityTest {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADF" => Ok(StationarityTest::Adf),
            "KPSS" => Ok(StationarityTest::Kpss),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "unknown test '{other}' (expected 'ADF' or 'KPSS')"
            ))),
        }
    }
}

/// One verdict per (ticker, feature) pair.
#[derive(Debug, Clone, Serialize)]
pub struct StationarityVerdict {
    pub ticker: String,
    pub feature: String,
    pub test: StationarityTest,
    pub statistic: f64,
    pub p_value: f64,
    pub is_stationary: bool,
}

/// Run the chosen test for every ticker × feature pair with enough data.
///
/// `features = None` selects every numeric column except the identifier and
/// time columns. An unknown or non-numeric requested feature fails with
/// `InvalidArgument`.
pub fn check_stationarity(
    df: &DataFrame,
    features: Option<&[String]>,
    test: StationarityTest,
    alpha: f64,
) -> Result<Vec<StationarityVerdict>, AnalyticsError> {
    let features: Vec<String> = match features {
        Some(given) => given.to_vec(),
        None => numeric_features(df),
    };

    let mut feature_cas = Vec::with_capacity(features.len());
    for name in &features {
        let ca = df
            .column(name)
            .map_err(|_| AnalyticsError::InvalidArgument(format!("unknown feature '{name}'")))?
            .cast(&DataType::Float64)
            .map_err(|_| {
                AnalyticsError::InvalidArgument(format!("feature '{name}' is not numeric"))
            })?
            .f64()
            .cloned()
            .map_err(|e| AnalyticsError::Frame(e.to_string()))?;
        feature_cas.push(ca);
    }

    let groups = ticker_row_indices(df)?;
    let mut verdicts = Vec::new();

    for (ticker, indices) in &groups {
        for (name, ca) in features.iter().zip(&feature_cas) {
            let series: Vec<f64> = indices
                .iter()
                .filter_map(|&row| ca.get(row as usize))
                .filter(|v| !v.is_nan())
                .collect();
            if series.len() < MIN_OBSERVATIONS {
                continue;
            }

            let outcome = match test {
                StationarityTest::Adf => adf_test(&series),
                StationarityTest::Kpss => kpss_test(&series),
            };
            let Some((statistic, p_value)) = outcome else {
                // Degenerate regression (e.g. constant ADF input): skip.
                continue;
            };

            let is_stationary = match test {
                StationarityTest::Adf => p_value < alpha,
                StationarityTest::Kpss => p_value > alpha,
            };

            verdicts.push(StationarityVerdict {
                ticker: ticker.clone(),
                feature: name.clone(),
                test,
                statistic,
                p_value,
                is_stationary,
            });
        }
    }

    Ok(verdicts)
}

/// Every numeric column except the identifier/time columns.
fn numeric_features(df: &DataFrame) -> Vec<String> {
    df.schema()
        .iter()
        .filter(|(name, dtype)| {
            name.as_str() != DATE
                && name.as_str() != TICKER
                && matches!(
                    dtype,
                    DataType::Float64
                        | DataType::Float32
                        | DataType::Int64
                        | DataType::Int32
                        | DataType::Int16
                        | DataType::Int8
                        | DataType::UInt64
                        | DataType::UInt32
                        | DataType::UInt16
                        | DataType::UInt8
                )
        })
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Augmented Dickey-Fuller test with a constant term.
///
/// Regression: `Δy_t = α + β·y_{t-1} + Σ γ_i·Δy_{t-i} + ε_t`, lag order by
/// the Schwert rule `12·(n/100)^{1/4}` bounded by the sample. The statistic
/// is the t-ratio on β. Returns None when the regression is degenerate.
fn adf_test(data: &[f64]) -> Option<(f64, f64)> {
    let n = data.len();
    let diff: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();

    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let lag = schwert.min(n.saturating_sub(5) / 2);

    let effective_n = diff.len() - lag;
    let num_regressors = 2 + lag;
    if effective_n < num_regressors + 2 {
        return None;
    }

    // Dependent: Δy_t for t = lag..; regressors: [1, y_{t-1}, Δy_{t-1}..Δy_{t-lag}].
    let y = DVector::from_iterator(effective_n, diff[lag..].iter().copied());
    let mut x_data = Vec::with_capacity(effective_n * num_regressors);
    for t in lag..diff.len() {
        x_data.push(1.0);
        x_data.push(data[t]);
        for i in 1..=lag {
            x_data.push(diff[t - i]);
        }
    }
    let x = DMatrix::from_row_slice(effective_n, num_regressors, &x_data);

    let xtx = x.transpose() * &x;
    let xty = x.transpose() * &y;
    let xtx_inv = xtx.try_inverse()?;
    let beta = &xtx_inv * xty;

    let residuals = &y - &x * &beta;
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let dof = effective_n - num_regressors;
    if dof == 0 {
        return None;
    }
    let mse = sse / dof as f64;
    let se = (mse * xtx_inv[(1, 1)]).sqrt();
    if !se.is_finite() || se == 0.0 {
        return None;
    }

    let t_stat = beta[1] / se;
    Some((t_stat, adf_p_value(t_stat, n)))
}

/// Approximate ADF p-value: piecewise-linear through the finite-sample
/// critical values (constant-only regression), exponential tails.
fn adf_p_value(t_stat: f64, n: usize) -> f64 {
    let nf = n as f64;
    let cv_1 = -3.43 - 6.0 / nf;
    let cv_5 = -2.86 - 4.0 / nf;
    let cv_10 = -2.57 - 3.0 / nf;

    if t_stat < cv_1 {
        0.01 * (t_stat - cv_1).exp()
    } else if t_stat < cv_5 {
        0.01 + 0.04 * (t_stat - cv_1) / (cv_5 - cv_1)
    } else if t_stat < cv_10 {
        0.05 + 0.05 * (t_stat - cv_5) / (cv_10 - cv_5)
    } else {
        0.10 + 0.90 * (1.0 - (-0.5 * (t_stat - cv_10)).exp())
    }
}

/// KPSS test with constant regression (level stationarity).
///
/// Statistic: `Σ S_t² / (n² · s²)` where S_t are partial sums of the
/// demeaned series and s² is the Newey-West long-run variance with
/// `4·(n/100)^{1/4}` lags.
fn kpss_test(data: &[f64]) -> Option<(f64, f64)> {
    let n = data.len();
    let m = mean(data);
    let demeaned: Vec<f64> = data.iter().map(|v| v - m).collect();

    let mut partial_sums = Vec::with_capacity(n);
    let mut cumulative = 0.0;
    for r in &demeaned {
        cumulative += r;
        partial_sums.push(cumulative);
    }

    let lag = (4.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let mut s2 = demeaned.iter().map(|r| r * r).sum::<f64>() / n as f64;
    for l in 1..=lag.min(n - 1) {
        let weight = 1.0 - l as f64 / (lag + 1) as f64;
        let gamma: f64 = demeaned[l..]
            .iter()
            .zip(demeaned[..n - l].iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        s2 += 2.0 * weight * gamma;
    }

    // Constant series: zero long-run variance, trivially level-stationary.
    if s2 <= 0.0 {
        return Some((0.0, 1.0));
    }

    let eta = partial_sums.iter().map(|s| s * s).sum::<f64>() / (n * n) as f64 / s2;
    Some((eta, kpss_p_value(eta)))
}

/// Approximate KPSS p-value for the constant-regression critical values.
fn kpss_p_value(eta: f64) -> f64 {
    const CV_10: f64 = 0.347;
    const CV_5: f64 = 0.463;
    const CV_1: f64 = 0.739;

    if eta < CV_10 {
        0.10 + 0.90 * (1.0 - eta / CV_10)
    } else if eta < CV_5 {
        0.05 + 0.05 * (CV_5 - eta) / (CV_5 - CV_10)
    } else if eta < CV_1 {
        0.01 + 0.04 * (CV_1 - eta) / (CV_1 - CV_5)
    } else {
        (0.01 * (1.0 - (eta - CV_1) / CV_1)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_to_dataframe;
    use crate::domain::Bar;
    use chrono::{Duration, TimeZone, Utc};

    fn bars_from_closes(ticker: &str, closes: &[f64]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                ticker: ticker.into(),
                timestamp: base + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    /// Deterministic pseudo-noise in [-1, 1] (no RNG dependency here).
    fn noise(i: usize) -> f64 {
        ((i as f64 * 12.9898).sin() * 43758.5453).fract()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        let mut values = vec![100.0];
        for i in 1..n {
            values.push(values[i - 1] + noise(i));
        }
        values
    }

    fn mean_reverting(n: usize) -> Vec<f64> {
        let mut values = vec![0.0];
        for i in 1..n {
            values.push(0.3 * values[i - 1] + noise(i));
        }
        values
    }

    #[test]
    fn adf_flags_mean_reverting_series_as_stationary() {
        let (stat, p) = adf_test(&mean_reverting(300)).unwrap();
        assert!(stat < -3.5, "stat = {stat}");
        assert!(p < 0.05, "p = {p}");
    }

    #[test]
    fn adf_does_not_reject_unit_root_for_random_walk() {
        let (stat, p) = adf_test(&random_walk(300)).unwrap();
        assert!(stat > -2.86, "stat = {stat}");
        assert!(p > 0.05, "p = {p}");
    }

    #[test]
    fn kpss_polarity_is_inverted() {
        let (_, p_stationary) = kpss_test(&mean_reverting(300)).unwrap();
        let (_, p_walk) = kpss_test(&random_walk(300)).unwrap();
        assert!(p_stationary > 0.05, "p = {p_stationary}");
        assert!(p_walk < 0.05, "p = {p_walk}");
    }

    #[test]
    fn constant_series_is_skipped_by_adf() {
        assert!(adf_test(&[5.0; 50]).is_none());
    }

    #[test]
    fn check_stationarity_defaults_to_numeric_features() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &mean_reverting(60))).unwrap();
        let verdicts =
            check_stationarity(&df, None, StationarityTest::Adf, 0.05).unwrap();

        // Open/High/Low/Close/Volume are all numeric; Volume is constant and
        // therefore skipped as degenerate.
        let features: Vec<&str> = verdicts.iter().map(|v| v.feature.as_str()).collect();
        assert!(features.contains(&"Close"));
        assert!(!features.contains(&"Ticker"));
        assert!(!features.contains(&"Volume"));
    }

    #[test]
    fn short_pairs_are_silently_skipped() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &[1.0, 2.0, 3.0])).unwrap();
        let verdicts =
            check_stationarity(&df, None, StationarityTest::Adf, 0.05).unwrap();
        assert!(verdicts.is_empty());
    }

    #[test]
    fn unknown_feature_is_invalid_argument() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &mean_reverting(60))).unwrap();
        let err = check_stationarity(
            &df,
            Some(&["Sentiment".to_string()]),
            StationarityTest::Adf,
            0.05,
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_test_kind_is_invalid_argument() {
        let err = "PP".parse::<StationarityTest>().unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn verdict_serializes_test_name() {
        let verdict = StationarityVerdict {
            ticker: "AAPL".into(),
            feature: "Close".into(),
            test: StationarityTest::Adf,
            statistic: -3.2,
            p_value: 0.02,
            is_stationary: true,
        };
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(json.contains("\"ADF\""));
    }
}
