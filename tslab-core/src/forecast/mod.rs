//! Forecast dispatcher: select and run one baseline model over a cleaned
//! daily series.
//!
//! Thin by design — each model is a closed-form recursion in `naive`; this
//! module only slices the requested (ticker, target) series, enforces the
//! minimum history, and builds the future date spine.

pub mod naive;

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::data::ticker_row_indices;
use crate::data::FrameError;

pub use naive::MaMode;

/// Minimum history length for any forecast.
pub const MIN_HISTORY: usize = 30;

/// Default season length for the seasonal-naive model (one week of daily bars).
pub const DEFAULT_SEASON_LENGTH: usize = 7;

/// Default moving-average window.
pub const DEFAULT_MA_WINDOW: usize = 26;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no data for ticker '{ticker}'")]
    TickerNotFound { ticker: String },

    #[error("unknown target column '{column}'")]
    UnknownColumn { column: String },

    #[error("unknown model '{0}' (expected naive, seasonal_naive, moving_average, drift, exp_smoothing)")]
    UnknownModel(String),

    #[error("insufficient history: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("frame error: {0}")]
    Frame(String),
}

impl From<FrameError> for ForecastError {
    fn from(e: FrameError) -> Self {
        ForecastError::Frame(e.to_string())
    }
}

/// Which baseline model to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastModel {
    Naive,
    SeasonalNaive,
    MovingAverage,
    Drift,
    ExpSmoothing,
}

impl FromStr for ForecastModel {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "naive" => Ok(ForecastModel::Naive),
            "seasonal_naive" => Ok(ForecastModel::SeasonalNaive),
            "moving_average" => Ok(ForecastModel::MovingAverage),
            "drift" => Ok(ForecastModel::Drift),
            "exp_smoothing" => Ok(ForecastModel::ExpSmoothing),
            other => Err(ForecastError::UnknownModel(other.to_string())),
        }
    }
}

/// One forecast step.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

/// Run a model over one ticker's series of `target` from a daily canonical
/// table. Future dates step one day from the last observation.
pub fn run_forecast(
    df: &DataFrame,
    ticker: &str,
    target: &str,
    horizon: usize,
    model: ForecastModel,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let groups = ticker_row_indices(df)?;
    let indices = groups
        .get(ticker)
        .ok_or_else(|| ForecastError::TickerNotFound {
            ticker: ticker.to_string(),
        })?;

    let ca = df
        .column(target)
        .map_err(|_| ForecastError::UnknownColumn {
            column: target.to_string(),
        })?
        .cast(&DataType::Float64)
        .map_err(|_| ForecastError::UnknownColumn {
            column: target.to_string(),
        })?
        .f64()
        .cloned()
        .map_err(|e| ForecastError::Frame(e.to_string()))?;

    let series: Vec<f64> = indices
        .iter()
        .filter_map(|&row| ca.get(row as usize))
        .filter(|v| !v.is_nan())
        .collect();
    if series.len() < MIN_HISTORY {
        return Err(ForecastError::InsufficientData {
            needed: MIN_HISTORY,
            got: series.len(),
        });
    }

    let values = match model {
        ForecastModel::Naive => naive::naive(&series, horizon),
        ForecastModel::SeasonalNaive => {
            naive::seasonal_naive(&series, horizon, DEFAULT_SEASON_LENGTH)
        }
        ForecastModel::MovingAverage => {
            naive::moving_average(&series, horizon, DEFAULT_MA_WINDOW, MaMode::Shift)
        }
        ForecastModel::Drift => naive::drift(&series, horizon, None),
        ForecastModel::ExpSmoothing => {
            naive::exponential_smoothing(&series, horizon, false, false)
        }
    };

    let last_date = last_timestamp(df, indices)?;
    Ok(values
        .into_iter()
        .enumerate()
        .map(|(h, value)| ForecastPoint {
            date: last_date + Duration::days(h as i64 + 1),
            value,
        })
        .collect())
}

fn last_timestamp(df: &DataFrame, indices: &[u32]) -> Result<DateTime<Utc>, ForecastError> {
    let Some(&row) = indices.last() else {
        return Err(ForecastError::Frame("empty ticker group".into()));
    };
    let bars = crate::data::dataframe_to_bars(&df.slice(row as i64, 1))?;
    bars.first()
        .map(|b| b.timestamp)
        .ok_or_else(|| ForecastError::Frame("empty slice for last row".into()))
}
