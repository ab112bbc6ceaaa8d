//! Sampling intervals and their per-interval store layout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sampling interval of a canonical table. One parquet store per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    M1,
    M15,
    H1,
    D1,
    W1,
}

#[derive(Debug, Error)]
#[error("unknown interval '{0}' (expected one of: 1m, 15m, 1h, 1d, 1w)")]
pub struct InvalidInterval(pub String);

impl Interval {
    /// All intervals, in ascending granularity order.
    pub const ALL: [Interval; 5] = [
        Interval::M1,
        Interval::M15,
        Interval::H1,
        Interval::D1,
        Interval::W1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }

    /// File name of this interval's parquet store.
    pub fn file_name(&self) -> &'static str {
        match self {
            Interval::M1 => "minute_data.parquet",
            Interval::M15 => "15min_data.parquet",
            Interval::H1 => "hour_data.parquet",
            Interval::D1 => "day_data.parquet",
            Interval::W1 => "week_data.parquet",
        }
    }

    /// Width of one backfill fetch window, in days.
    pub fn step_days(&self) -> i64 {
        match self {
            Interval::M1 => 12,
            Interval::M15 => 60,
            Interval::H1 => 182,
            Interval::D1 => 1825,
            Interval::W1 => 3650,
        }
    }

    /// True for sub-daily intervals (session-gap semantics differ).
    pub fn is_intraday(&self) -> bool {
        matches!(self, Interval::M1 | Interval::M15 | Interval::H1)
    }
}

impl FromStr for Interval {
    type Err = InvalidInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "15min" is accepted as a legacy alias for "15m".
        match s {
            "1m" => Ok(Interval::M1),
            "15m" | "15min" => Ok(Interval::M15),
            "1h" => Ok(Interval::H1),
            "1d" => Ok(Interval::D1),
            "1w" => Ok(Interval::W1),
            other => Err(InvalidInterval(other.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
