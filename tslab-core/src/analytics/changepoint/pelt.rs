//! Penalized exact changepoint search (PELT).
//!
//! The penalty implicitly determines the breakpoint count: each additional
//! segment must reduce total cost by more than `penalty` to be worth it.
//! Candidate last-changepoints are pruned with the standard PELT condition,
//! keeping the search near-linear on series with many changes.

use super::cost::SegmentCost;

/// Optimal penalized segmentation. Returns sorted breakpoint indices; the
/// last element is the series length (sentinel). Caller guarantees the
/// series has at least `min_size` observations.
pub(crate) fn breakpoints(cost: &SegmentCost, penalty: f64, min_size: usize) -> Vec<usize> {
    let n = cost.len();
    if n < 2 * min_size {
        // No admissible interior breakpoint.
        return vec![n];
    }

    let mut f = vec![f64::INFINITY; n + 1];
    f[0] = -penalty;
    let mut prev = vec![0usize; n + 1];
    let mut candidates: Vec<usize> = vec![0];

    for t in min_size..=n {
        if t >= 2 * min_size {
            candidates.push(t - min_size);
        }

        let mut best = f64::INFINITY;
        let mut best_s = 0;
        for &s in &candidates {
            let value = f[s] + cost.cost(s, t) + penalty;
            if value < best {
                best = value;
                best_s = s;
            }
        }
        f[t] = best;
        prev[t] = best_s;

        candidates.retain(|&s| f[s] + cost.cost(s, t) <= f[t]);
    }

    let mut bkps = vec![n];
    let mut t = n;
    while prev[t] > 0 {
        t = prev[t];
        bkps.push(t);
    }
    bkps.reverse();
    bkps
}
