//! Structural-break segmentation of canonical tables.
//!
//! Two searchers over per-ticker series of one or more numeric target
//! columns (default: close price only), each fit independently per ticker —
//! no cross-ticker leakage:
//!
//! - `segment_kernel` — kernel model with a fixed breakpoint count.
//! - `segment_pelt` — penalized exact search; the penalty determines the
//!   breakpoint count.
//!
//! Output is the input table reordered ticker-ascending / time-ascending
//! with two appended columns: `changepoint` (1 at each breakpoint row except
//! the end sentinel) and `segment_id` (0-based, incrementing at each
//! boundary). Segmentation is recomputed from scratch per call.
//!
//! Series are capped to the most recent `max_obs` observations per ticker
//! before fitting (the cost oracle is O(n²)); capped-away rows are absent
//! from the output.

mod cost;
mod kernel;
mod pelt;

pub use cost::CostModel;

use polars::prelude::*;
use serde::Serialize;

use super::AnalyticsError;
use crate::data::schema::CLOSE;
use crate::data::ticker_row_indices;
use cost::SegmentCost;

/// Parameters for the fixed-count kernel searcher.
#[derive(Debug, Clone, Serialize)]
pub struct KernelParams {
    pub target_cols: Vec<String>,
    pub kernel: CostModel,
    pub n_bkps: usize,
    pub min_size: usize,
    pub max_obs: usize,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            target_cols: vec![CLOSE.to_string()],
            kernel: CostModel::Rbf,
            n_bkps: 5,
            min_size: 30,
            max_obs: 2000,
        }
    }
}

/// Parameters for the penalized exact searcher.
#[derive(Debug, Clone, Serialize)]
pub struct PeltParams {
    pub target_cols: Vec<String>,
    pub cost_model: CostModel,
    pub penalty: f64,
    pub min_size: usize,
    pub max_obs: usize,
}

impl Default for PeltParams {
    fn default() -> Self {
        Self {
            target_cols: vec![CLOSE.to_string()],
            cost_model: CostModel::Rbf,
            penalty: 5.0,
            min_size: 30,
            max_obs: 2000,
        }
    }
}

/// Kernel segmentation with a fixed number of breakpoints per ticker.
pub fn segment_kernel(df: &DataFrame, params: &KernelParams) -> Result<DataFrame, AnalyticsError> {
    let needed = (params.n_bkps + 1) * params.min_size;
    segment_table(
        df,
        &params.target_cols,
        params.max_obs,
        params.min_size,
        params.kernel,
        |cost, ticker| {
            kernel::breakpoints(cost, params.n_bkps, params.min_size).ok_or_else(|| {
                AnalyticsError::InsufficientData {
                    ticker: ticker.to_string(),
                    needed,
                    got: cost.len(),
                }
            })
        },
    )
}

/// Penalized exact segmentation per ticker.
pub fn segment_pelt(df: &DataFrame, params: &PeltParams) -> Result<DataFrame, AnalyticsError> {
    segment_table(
        df,
        &params.target_cols,
        params.max_obs,
        params.min_size,
        params.cost_model,
        |cost, _| Ok(pelt::breakpoints(cost, params.penalty, params.min_size)),
    )
}

fn segment_table<F>(
    df: &DataFrame,
    target_cols: &[String],
    max_obs: usize,
    min_size: usize,
    model: CostModel,
    fit: F,
) -> Result<DataFrame, AnalyticsError>
where
    F: Fn(&SegmentCost, &str) -> Result<Vec<usize>, AnalyticsError>,
{
    if target_cols.is_empty() {
        return Err(AnalyticsError::InvalidArgument(
            "target_cols must not be empty".into(),
        ));
    }
    if min_size == 0 {
        return Err(AnalyticsError::InvalidArgument(
            "min_size must be positive".into(),
        ));
    }

    let mut feature_cas = Vec::with_capacity(target_cols.len());
    for name in target_cols {
        let ca = df
            .column(name)
            .map_err(|_| AnalyticsError::InvalidArgument(format!("unknown target column '{name}'")))?
            .cast(&DataType::Float64)
            .map_err(|_| {
                AnalyticsError::InvalidArgument(format!("target column '{name}' is not numeric"))
            })?
            .f64()
            .cloned()
            .map_err(|e| AnalyticsError::Frame(e.to_string()))?;
        feature_cas.push(ca);
    }

    let groups = ticker_row_indices(df)?;

    let mut order: Vec<u32> = Vec::with_capacity(df.height());
    let mut changepoints: Vec<i32> = Vec::with_capacity(df.height());
    let mut segment_ids: Vec<i32> = Vec::with_capacity(df.height());

    for (ticker, indices) in &groups {
        if indices.len() < min_size {
            return Err(AnalyticsError::InsufficientData {
                ticker: ticker.clone(),
                needed: min_size,
                got: indices.len(),
            });
        }
        let capped = &indices[indices.len().saturating_sub(max_obs)..];

        let points: Vec<Vec<f64>> = capped
            .iter()
            .map(|&row| {
                feature_cas
                    .iter()
                    .map(|ca| ca.get(row as usize).unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();

        let cost = SegmentCost::new(&points, model);
        let bkps = fit(&cost, ticker)?;

        let n = capped.len();
        let mut flags = vec![0i32; n];
        for &b in &bkps[..bkps.len() - 1] {
            flags[b] = 1;
        }
        let mut ids = vec![0i32; n];
        let mut segment = 0i32;
        let mut last = 0usize;
        for &b in &bkps {
            for id in &mut ids[last..b] {
                *id = segment;
            }
            segment += 1;
            last = b;
        }

        order.extend_from_slice(capped);
        changepoints.extend(flags);
        segment_ids.extend(ids);
    }

    let mut out = df
        .take(&IdxCa::from_vec("idx".into(), order))
        .map_err(|e| AnalyticsError::Frame(e.to_string()))?;
    out.with_column(Column::new("changepoint".into(), changepoints))
        .map_err(|e| AnalyticsError::Frame(e.to_string()))?;
    out.with_column(Column::new("segment_id".into(), segment_ids))
        .map_err(|e| AnalyticsError::Frame(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bars_to_dataframe;
    use crate::domain::Bar;
    use chrono::{Duration, TimeZone, Utc};

    /// Bars whose close follows the given values, one per day.
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

    fn shift_series() -> Vec<f64> {
        let mut values = vec![100.0; 40];
        values.extend(vec![150.0; 40]);
        values
    }

    #[test]
    fn pelt_marks_single_shift() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &shift_series())).unwrap();
        let params = PeltParams {
            min_size: 10,
            ..Default::default()
        };

        let segmented = segment_pelt(&df, &params).unwrap();
        let flags = segmented.column("changepoint").unwrap().i32().unwrap();
        let ids = segmented.column("segment_id").unwrap().i32().unwrap();

        let marked: Vec<usize> = (0..segmented.height())
            .filter(|&i| flags.get(i) == Some(1))
            .collect();
        assert_eq!(marked, vec![40]);
        assert_eq!(ids.get(39), Some(0));
        assert_eq!(ids.get(40), Some(1));
        assert_eq!(ids.get(79), Some(1));
    }

    #[test]
    fn kernel_fixed_count_marks_requested_breakpoints() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &shift_series())).unwrap();
        let params = KernelParams {
            n_bkps: 1,
            min_size: 10,
            ..Default::default()
        };

        let segmented = segment_kernel(&df, &params).unwrap();
        let flags = segmented.column("changepoint").unwrap().i32().unwrap();
        let marked: Vec<usize> = (0..segmented.height())
            .filter(|&i| flags.get(i) == Some(1))
            .collect();
        assert_eq!(marked, vec![40]);
    }

    #[test]
    fn segment_id_distinct_count_is_changepoints_plus_one() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &shift_series())).unwrap();
        let params = PeltParams {
            min_size: 10,
            ..Default::default()
        };

        let segmented = segment_pelt(&df, &params).unwrap();
        let flags = segmented.column("changepoint").unwrap().i32().unwrap();
        let ids = segmented.column("segment_id").unwrap().i32().unwrap();

        let marked = (0..segmented.height()).filter(|&i| flags.get(i) == Some(1)).count();
        let mut distinct: Vec<i32> = (0..segmented.height()).filter_map(|i| ids.get(i)).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), marked + 1);
    }

    #[test]
    fn tickers_are_segmented_independently() {
        // AAPL shifts at 40; NVDA is flat and must stay a single segment.
        let mut bars = bars_from_closes("AAPL", &shift_series());
        bars.extend(bars_from_closes("NVDA", &vec![500.0; 80]));
        let df = bars_to_dataframe(&bars).unwrap();
        let params = PeltParams {
            min_size: 10,
            ..Default::default()
        };

        let segmented = segment_pelt(&df, &params).unwrap();
        let tickers = segmented.column("Ticker").unwrap().str().unwrap();
        let flags = segmented.column("changepoint").unwrap().i32().unwrap();
        let ids = segmented.column("segment_id").unwrap().i32().unwrap();

        for i in 0..segmented.height() {
            if tickers.get(i) == Some("NVDA") {
                assert_eq!(flags.get(i), Some(0));
                assert_eq!(ids.get(i), Some(0));
            }
        }
        let aapl_marks = (0..segmented.height())
            .filter(|&i| tickers.get(i) == Some("AAPL") && flags.get(i) == Some(1))
            .count();
        assert_eq!(aapl_marks, 1);
    }

    #[test]
    fn short_group_fails_with_insufficient_data() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &[1.0, 2.0, 3.0])).unwrap();
        let err = segment_pelt(&df, &PeltParams::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn unknown_target_column_is_invalid_argument() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &shift_series())).unwrap();
        let params = PeltParams {
            target_cols: vec!["Sentiment".into()],
            min_size: 10,
            ..Default::default()
        };

        let err = segment_pelt(&df, &params).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn max_obs_caps_output_rows() {
        let df = bars_to_dataframe(&bars_from_closes("AAPL", &shift_series())).unwrap();
        let params = PeltParams {
            min_size: 10,
            max_obs: 50,
            ..Default::default()
        };

        let segmented = segment_pelt(&df, &params).unwrap();
        assert_eq!(segmented.height(), 50);
    }
}
