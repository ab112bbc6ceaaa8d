//! Scalar statistics over f64 slices.
//!
//! All functions skip NaN values; NaN is the in-memory form of a null cell.
//! `sample_std` divides by n - 1 (sample convention).

/// Mean of the finite values; NaN when none.
pub fn mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Sample standard deviation (ddof = 1); NaN with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            let d = v - m;
            sum_sq += d * d;
            count += 1;
        }
    }
    if count < 2 {
        f64::NAN
    } else {
        (sum_sq / (count - 1) as f64).sqrt()
    }
}

/// Population variance (ddof = 0) of the finite values; NaN when none.
pub fn population_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for &v in values {
        if !v.is_nan() {
            let d = v - m;
            sum_sq += d * d;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum_sq / count as f64
    }
}

/// Median of the finite values; NaN when none.
pub fn median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(f64::total_cmp);
    let n = finite.len();
    if n % 2 == 1 {
        finite[n / 2]
    } else {
        (finite[n / 2 - 1] + finite[n / 2]) / 2.0
    }
}

/// Median absolute deviation around the median; NaN when empty.
pub fn mad(values: &[f64]) -> f64 {
    let med = median(values);
    if med.is_nan() {
        return f64::NAN;
    }
    let deviations: Vec<f64> = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - med).abs())
        .collect();
    median(&deviations)
}
