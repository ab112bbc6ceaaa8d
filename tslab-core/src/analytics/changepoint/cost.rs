//! Segment cost models for changepoint search.
//!
//! Both searchers score a candidate segment `[start, end)` through a
//! precomputed `SegmentCost`, built once per series:
//!
//! - `Rbf` — kernel cost with a Gaussian kernel. Bandwidth follows the median
//!   heuristic: `gamma = 1 / median(pairwise squared distances)`, falling
//!   back to 1.0 when the median is zero. The gram matrix and its 2-D prefix
//!   sums make each segment cost O(1) at O(n²) memory, which is why callers
//!   cap the series length.
//! - `L2` — within-segment sum of squared deviations from the segment mean,
//!   via per-dimension prefix sums at O(n·d) memory.
//!
//! Cost of a kernel segment: `sum_i k(x_i, x_i) − (1/len) · sum_{i,j} k(x_i, x_j)`.

use std::str::FromStr;

use serde::Serialize;

use crate::analytics::AnalyticsError;

/// Cost model used to score candidate segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CostModel {
    Rbf,
    L2,
}

impl FromStr for CostModel {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rbf" => Ok(CostModel::Rbf),
            "l2" | "linear" => Ok(CostModel::L2),
            other => Err(AnalyticsError::InvalidArgument(format!(
                "unknown cost model '{other}' (expected 'rbf' or 'l2')"
            ))),
        }
    }
}

/// Precomputed segment-cost oracle for one series of d-dimensional points.
pub(crate) enum SegmentCost {
    Rbf {
        n: usize,
        /// (n+1)² prefix sums of the gram matrix, row-major.
        gram_prefix: Vec<f64>,
    },
    L2 {
        n: usize,
        dims: usize,
        /// (n+1)·d prefix sums of values, row-major by point.
        sum_prefix: Vec<f64>,
        /// (n+1) prefix sums of squared norms.
        sumsq_prefix: Vec<f64>,
    },
}

impl SegmentCost {
    pub(crate) fn new(points: &[Vec<f64>], model: CostModel) -> Self {
        match model {
            CostModel::Rbf => Self::new_rbf(points),
            CostModel::L2 => Self::new_l2(points),
        }
    }

    fn new_rbf(points: &[Vec<f64>]) -> Self {
        let n = points.len();
        let gamma = median_heuristic_gamma(points);

        // Gram matrix, then 2-D prefix sums over it.
        let mut gram = vec![0.0; n * n];
        for i in 0..n {
            gram[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let k = (-gamma * squared_distance(&points[i], &points[j])).exp();
                gram[i * n + j] = k;
                gram[j * n + i] = k;
            }
        }

        let stride = n + 1;
        let mut gram_prefix = vec![0.0; stride * stride];
        for i in 0..n {
            for j in 0..n {
                gram_prefix[(i + 1) * stride + (j + 1)] = gram[i * n + j]
                    + gram_prefix[i * stride + (j + 1)]
                    + gram_prefix[(i + 1) * stride + j]
                    - gram_prefix[i * stride + j];
            }
        }

        SegmentCost::Rbf { n, gram_prefix }
    }

    fn new_l2(points: &[Vec<f64>]) -> Self {
        let n = points.len();
        let dims = points.first().map_or(0, Vec::len);

        let mut sum_prefix = vec![0.0; (n + 1) * dims];
        let mut sumsq_prefix = vec![0.0; n + 1];
        for (i, point) in points.iter().enumerate() {
            let mut norm_sq = 0.0;
            for d in 0..dims {
                sum_prefix[(i + 1) * dims + d] = sum_prefix[i * dims + d] + point[d];
                norm_sq += point[d] * point[d];
            }
            sumsq_prefix[i + 1] = sumsq_prefix[i] + norm_sq;
        }

        SegmentCost::L2 {
            n,
            dims,
            sum_prefix,
            sumsq_prefix,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            SegmentCost::Rbf { n, .. } => *n,
            SegmentCost::L2 { n, .. } => *n,
        }
    }

    /// Cost of the segment `[start, end)`. Caller guarantees `start < end <= n`.
    pub(crate) fn cost(&self, start: usize, end: usize) -> f64 {
        let len = (end - start) as f64;
        match self {
            SegmentCost::Rbf { n, gram_prefix } => {
                let stride = n + 1;
                let block = gram_prefix[end * stride + end]
                    - gram_prefix[start * stride + end]
                    - gram_prefix[end * stride + start]
                    + gram_prefix[start * stride + start];
                // Diagonal of an RBF gram is all ones.
                len - block / len
            }
            SegmentCost::L2 {
                dims,
                sum_prefix,
                sumsq_prefix,
                ..
            } => {
                let mut mean_term = 0.0;
                for d in 0..*dims {
                    let s = sum_prefix[end * dims + d] - sum_prefix[start * dims + d];
                    mean_term += s * s;
                }
                (sumsq_prefix[end] - sumsq_prefix[start]) - mean_term / len
            }
        }
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// `gamma = 1 / median(pairwise squared distances)`, 1.0 when degenerate.
fn median_heuristic_gamma(points: &[Vec<f64>]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 1.0;
    }
    let mut distances = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            distances.push(squared_distance(&points[i], &points[j]));
        }
    }
    let mid = distances.len() / 2;
    let (_, med, _) =
        distances.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if *med > 0.0 {
        1.0 / *med
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[f64]) -> Vec<Vec<f64>> {
        values.iter().map(|&v| vec![v]).collect()
    }

    #[test]
    fn l2_cost_is_sum_of_squared_deviations() {
        let cost = SegmentCost::new(&column(&[1.0, 2.0, 3.0, 4.0]), CostModel::L2);
        // Full segment: mean 2.5, SSE = 2.25 + 0.25 + 0.25 + 2.25 = 5.0
        assert!((cost.cost(0, 4) - 5.0).abs() < 1e-12);
        // Constant sub-segment costs zero.
        assert!(cost.cost(0, 1).abs() < 1e-12);
    }

    #[test]
    fn rbf_cost_of_constant_segment_is_zero() {
        let cost = SegmentCost::new(&column(&[5.0, 5.0, 5.0, 5.0]), CostModel::Rbf);
        assert!(cost.cost(0, 4).abs() < 1e-9);
    }

    #[test]
    fn rbf_cost_increases_when_mixing_regimes() {
        let mut values = vec![0.0; 10];
        values.extend(vec![10.0; 10]);
        let cost = SegmentCost::new(&column(&values), CostModel::Rbf);

        let split = cost.cost(0, 10) + cost.cost(10, 20);
        let merged = cost.cost(0, 20);
        assert!(merged > split + 1.0);
    }

    #[test]
    fn cost_model_parse() {
        assert_eq!("rbf".parse::<CostModel>().unwrap(), CostModel::Rbf);
        assert_eq!("L2".parse::<CostModel>().unwrap(), CostModel::L2);
        assert!("cosine".parse::<CostModel>().is_err());
    }
}
