//! Integration tests for the cleaning contract.

use polars::prelude::*;
use tslab_core::data::schema::{CLOSE, DATE, HIGH, LOW, OPEN, TICKER, VOLUME};
use tslab_core::data::{dataframe_to_bars, Cleaner};

/// Mixed-quality raw table: two tickers, one duplicate key, one inverted bar,
/// one unparseable date.
fn messy_frame() -> DataFrame {
    df!(
        DATE => &[
            "2024-01-02", "2024-01-03", "2024-01-03", "garbage",
            "2024-01-02", "2024-01-03",
        ],
        TICKER => &["AAPL", "AAPL", "AAPL", "AAPL", "NVDA", "NVDA"],
        OPEN => &[100.0, 101.0, 555.0, 102.0, 500.0, 505.0],
        HIGH => &[105.0, 106.0, 556.0, 107.0, 510.0, 490.0], // last NVDA bar inverted
        LOW => &[99.0, 100.0, 554.0, 101.0, 495.0, 511.0],
        CLOSE => &[103.0, 104.0, 555.5, 105.0, 505.0, 500.0],
        VOLUME => &[1000.0, 1100.0, 1200.0, 1300.0, 2000.0, 2100.0],
    )
    .unwrap()
}

#[test]
fn cleaned_rows_satisfy_all_ohlc_inequalities() {
    let cleaned = Cleaner::clean(messy_frame()).unwrap();
    for bar in dataframe_to_bars(&cleaned).unwrap() {
        assert!(bar.is_sane(), "insane bar survived cleaning: {bar:?}");
    }
}

#[test]
fn cleaned_keys_are_unique() {
    let cleaned = Cleaner::clean(messy_frame()).unwrap();
    let bars = dataframe_to_bars(&cleaned).unwrap();
    let mut keys: Vec<(String, i64)> = bars
        .iter()
        .map(|b| (b.ticker.clone(), b.timestamp.timestamp_millis()))
        .collect();
    let total = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), total);
}

#[test]
fn duplicate_resolution_keeps_last_ingested_row() {
    let cleaned = Cleaner::clean(messy_frame()).unwrap();
    let bars = dataframe_to_bars(&cleaned).unwrap();
    let dup = bars
        .iter()
        .find(|b| b.ticker == "AAPL" && b.open > 500.0)
        .expect("the later duplicate should win");
    assert_eq!(dup.close, 555.5);
}

#[test]
fn exactly_the_invalid_rows_are_dropped() {
    // 6 rows in: one duplicate collapsed, one inverted dropped, one bad date
    // dropped → 3 rows out.
    let cleaned = Cleaner::clean(messy_frame()).unwrap();
    assert_eq!(cleaned.height(), 3);

    let bars = dataframe_to_bars(&cleaned).unwrap();
    assert_eq!(bars.iter().filter(|b| b.ticker == "NVDA").count(), 1);
}

#[test]
fn cleaning_is_idempotent() {
    let once = Cleaner::clean(messy_frame()).unwrap();
    let twice = Cleaner::clean(once.clone()).unwrap();
    assert!(once.equals_missing(&twice));
}

#[test]
fn presentation_order_is_ticker_asc_date_desc() {
    let cleaned = Cleaner::clean(messy_frame()).unwrap();
    let tickers = cleaned.column(TICKER).unwrap().str().unwrap();
    let dates = cleaned.column(DATE).unwrap().datetime().unwrap();

    for i in 1..cleaned.height() {
        let (t0, t1) = (tickers.get(i - 1).unwrap(), tickers.get(i).unwrap());
        assert!(t0 <= t1);
        if t0 == t1 {
            assert!(dates.get(i - 1).unwrap() > dates.get(i).unwrap());
        }
    }
}
