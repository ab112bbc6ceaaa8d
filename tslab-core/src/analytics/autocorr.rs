//! Autocorrelation (ACF) and partial autocorrelation (PACF).
//!
//! Feeds the correlogram endpoint of the surrounding service; plotting
//! itself happens elsewhere.

use super::stats::{mean, population_variance};

/// Autocorrelation for lags 0..=max_lag (biased estimator, lag 0 == 1).
pub fn acf(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return vec![];
    }

    let max_lag = max_lag.min(n - 1);
    let m = mean(data);
    let var = population_variance(data);
    if var == 0.0 {
        return vec![1.0; max_lag + 1];
    }

    (0..=max_lag)
        .map(|lag| {
            if lag == 0 {
                return 1.0;
            }
            let covariance: f64 = data[lag..]
                .iter()
                .zip(data[..n - lag].iter())
                .map(|(a, b)| (a - m) * (b - m))
                .sum();
            covariance / (n as f64 * var)
        })
        .collect()
}

/// Partial autocorrelation via the Durbin-Levinson recursion.
pub fn pacf(data: &[f64], max_lag: usize) -> Vec<f64> {
    let acf_values = acf(data, max_lag);
    if acf_values.is_empty() {
        return vec![];
    }

    let max_lag = max_lag.min(acf_values.len() - 1);
    let mut pacf_values = vec![0.0; max_lag + 1];
    pacf_values[0] = 1.0;
    if max_lag == 0 {
        return pacf_values;
    }

    let mut phi = vec![vec![0.0; max_lag + 1]; max_lag + 1];
    phi[1][1] = acf_values[1];
    pacf_values[1] = phi[1][1];

    for k in 2..=max_lag {
        let mut numerator = acf_values[k];
        for j in 1..k {
            numerator -= phi[k - 1][j] * acf_values[k - j];
        }
        let mut denominator = 1.0;
        for j in 1..k {
            denominator -= phi[k - 1][j] * acf_values[j];
        }
        if denominator.abs() < 1e-10 {
            break;
        }

        phi[k][k] = numerator / denominator;
        pacf_values[k] = phi[k][k];
        for j in 1..k {
            phi[k][j] = phi[k - 1][j] - phi[k][k] * phi[k - 1][k - j];
        }
    }

    pacf_values
}

/// White-noise confidence bound for a correlogram: `z / sqrt(n)` at 95%.
pub fn confidence_bound(n: usize) -> f64 {
    1.96 / (n as f64).sqrt()
}
