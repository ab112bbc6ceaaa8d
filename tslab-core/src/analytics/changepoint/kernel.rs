//! Kernel changepoint search with a fixed breakpoint count.
//!
//! Exact dynamic program over segment costs: `dp[k][t]` is the best cost of
//! splitting the prefix `[0, t)` into `k` segments of at least `min_size`
//! observations each. O(k·n²) with the O(1) cost oracle.

use super::cost::SegmentCost;

/// Best segmentation of the series into `n_bkps + 1` segments.
///
/// Returns the sorted breakpoint indices; the last element is the series
/// length (sentinel end marker, not a real changepoint). `None` when no
/// segmentation satisfies the minimum segment length.
pub(crate) fn breakpoints(
    cost: &SegmentCost,
    n_bkps: usize,
    min_size: usize,
) -> Option<Vec<usize>> {
    let n = cost.len();
    let segments = n_bkps + 1;
    if min_size == 0 || n < segments * min_size {
        return None;
    }

    let inf = f64::INFINITY;
    let mut dp = vec![vec![inf; n + 1]; segments + 1];
    let mut parent = vec![vec![0usize; n + 1]; segments + 1];
    dp[0][0] = 0.0;

    for k in 1..=segments {
        // A prefix of k segments spans at least k*min_size points and must
        // leave room for the remaining segments.
        let t_lo = k * min_size;
        let t_hi = n - (segments - k) * min_size;
        for t in t_lo..=t_hi {
            let s_lo = (k - 1) * min_size;
            let mut best = inf;
            let mut best_s = 0;
            for s in s_lo..=(t - min_size) {
                let prefix = dp[k - 1][s];
                if !prefix.is_finite() {
                    continue;
                }
                let candidate = prefix + cost.cost(s, t);
                if candidate < best {
                    best = candidate;
                    best_s = s;
                }
            }
            dp[k][t] = best;
            parent[k][t] = best_s;
        }
    }

    if !dp[segments][n].is_finite() {
        return None;
    }

    let mut bkps = vec![n];
    let mut t = n;
    for k in (1..segments).rev() {
        t = parent[k + 1][t];
        bkps.push(t);
    }
    bkps.reverse();
    Some(bkps)
}
