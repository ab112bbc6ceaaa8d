//! Baseline forecasters over a univariate history.
//!
//! All functions take the ascending history and a horizon, and return one
//! value per future step. The smoothing-weight search in
//! `exponential_smoothing` replaces an MLE fit with a one-step-SSE grid:
//! deterministic and auditable, which is all these baselines promise.

/// Repeat the last observed value.
pub fn naive(series: &[f64], horizon: usize) -> Vec<f64> {
    let last = *series.last().expect("non-empty series");
    vec![last; horizon]
}

/// Tile the last season across the horizon.
pub fn seasonal_naive(series: &[f64], horizon: usize, season_length: usize) -> Vec<f64> {
    let season_length = season_length.min(series.len()).max(1);
    let season = &series[series.len() - season_length..];
    (0..horizon).map(|h| season[h % season_length]).collect()
}

/// Window behavior for the moving-average forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaMode {
    /// Fixed window sliding over history extended with its own forecasts.
    Shift,
    /// Window grows by one with each forecast step.
    Expanding,
}

/// Moving-average forecast: each step appends its own forecast to the
/// history, so multi-step forecasts converge toward the window mean.
pub fn moving_average(series: &[f64], horizon: usize, window: usize, mode: MaMode) -> Vec<f64> {
    let mut history: Vec<f64> = series.to_vec();
    let mut forecasts = Vec::with_capacity(horizon);

    for step in 0..horizon {
        let current_window = match mode {
            MaMode::Shift => window,
            MaMode::Expanding => window + step,
        }
        .min(history.len())
        .max(1);

        let tail = &history[history.len() - current_window..];
        let ma = tail.iter().sum::<f64>() / current_window as f64;
        forecasts.push(ma);
        history.push(ma);
    }

    forecasts
}

/// Drift forecast: extend the straight line through the first and last
/// observations (optionally of a trailing lookback window).
pub fn drift(series: &[f64], horizon: usize, lookback: Option<usize>) -> Vec<f64> {
    let window = match lookback {
        Some(k) => &series[series.len() - k.min(series.len())..],
        None => series,
    };
    let n = window.len();
    let last = window[n - 1];
    if n < 2 {
        return vec![last; horizon];
    }
    let slope = (last - window[0]) / (n - 1) as f64;
    (1..=horizon).map(|h| last + slope * h as f64).collect()
}

/// Exponential smoothing: SES, or Holt's linear trend when `trend` is set,
/// optionally damped. Smoothing weights are chosen by grid search minimizing
/// one-step squared error over the history.
pub fn exponential_smoothing(series: &[f64], horizon: usize, trend: bool, damped: bool) -> Vec<f64> {
    if trend {
        holt_forecast(series, horizon, damped)
    } else {
        ses_forecast(series, horizon)
    }
}

fn ses_forecast(series: &[f64], horizon: usize) -> Vec<f64> {
    let mut best_alpha = 0.5;
    let mut best_sse = f64::INFINITY;
    for step in 1..100 {
        let alpha = step as f64 / 100.0;
        let sse = ses_sse(series, alpha);
        if sse < best_sse {
            best_sse = sse;
            best_alpha = alpha;
        }
    }

    let mut level = series[0];
    for &y in &series[1..] {
        level = best_alpha * y + (1.0 - best_alpha) * level;
    }
    vec![level; horizon]
}

fn ses_sse(series: &[f64], alpha: f64) -> f64 {
    let mut level = series[0];
    let mut sse = 0.0;
    for &y in &series[1..] {
        let err = y - level;
        sse += err * err;
        level = alpha * y + (1.0 - alpha) * level;
    }
    sse
}

fn holt_forecast(series: &[f64], horizon: usize, damped: bool) -> Vec<f64> {
    let phi = if damped { 0.98 } else { 1.0 };

    let mut best = (0.5, 0.1);
    let mut best_sse = f64::INFINITY;
    for a in 1..20 {
        for b in 1..20 {
            let alpha = a as f64 / 20.0;
            let beta = b as f64 / 20.0;
            let sse = holt_sse(series, alpha, beta, phi);
            if sse < best_sse {
                best_sse = sse;
                best = (alpha, beta);
            }
        }
    }
    let (alpha, beta) = best;

    let (mut level, mut trend) = (series[0], series[1] - series[0]);
    for &y in &series[1..] {
        let prev_level = level;
        level = alpha * y + (1.0 - alpha) * (prev_level + phi * trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * phi * trend;
    }

    let mut forecasts = Vec::with_capacity(horizon);
    let mut damping_sum = 0.0;
    for h in 1..=horizon {
        damping_sum += phi.powi(h as i32);
        forecasts.push(level + damping_sum * trend);
    }
    forecasts
}

fn holt_sse(series: &[f64], alpha: f64, beta: f64, phi: f64) -> f64 {
    let (mut level, mut trend) = (series[0], series[1] - series[0]);
    let mut sse = 0.0;
    for &y in &series[1..] {
        let forecast = level + phi * trend;
        let err = y - forecast;
        sse += err * err;
        let prev_level = level;
        level = alpha * y + (1.0 - alpha) * forecast;
        trend = beta * (level - prev_level) + (1.0 - beta) * phi * trend;
    }
    sse
}
