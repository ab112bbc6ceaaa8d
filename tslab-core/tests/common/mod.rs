//! Shared builders for integration tests: synthetic bars and series.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tslab_core::domain::Bar;

pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

/// Daily bars from close prices: open = prev close (or close for the first
/// bar), high/low bracket open and close, volume 1000.
pub fn daily_bars(ticker: &str, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ticker: ticker.to_string(),
                timestamp: base_date() + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Seeded random walk: y_t = y_{t-1} + u_t with uniform steps and a small
/// positive drift.
pub fn random_walk(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = vec![100.0];
    for _ in 1..n {
        let step: f64 = rng.gen_range(-1.0..1.0) + 0.05;
        values.push(values.last().unwrap() + step);
    }
    values
}

/// Seeded mean-reverting AR(1): y_t = phi * y_{t-1} + u_t.
pub fn mean_reverting(seed: u64, n: usize, phi: f64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut values = vec![0.0];
    for _ in 1..n {
        let shock: f64 = rng.gen_range(-1.0..1.0);
        values.push(phi * values.last().unwrap() + shock);
    }
    values
}
