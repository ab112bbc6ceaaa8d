//! End-to-end outlier detection over synthetic tables.

mod common;

use tslab_core::analytics::{detect_outliers, OutlierParams};
use tslab_core::data::bars_to_dataframe;
use tslab_core::domain::Bar;

/// 40 daily bars where close increases by exactly 1.0 each day, high = close,
/// low = open, volume = 1000.
fn steady_table() -> Vec<Bar> {
    (0..40)
        .map(|i| {
            let close = 100.0 + i as f64;
            let open = close - 1.0;
            Bar {
                ticker: "TEST".into(),
                timestamp: common::base_date() + chrono::Duration::days(i as i64),
                open,
                high: close,
                low: open,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[test]
fn steady_series_has_no_price_outliers() {
    let df = bars_to_dataframe(&steady_table()).unwrap();
    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();

    assert_eq!(records.len(), 40);
    assert_eq!(records.iter().filter(|r| r.price_outlier).count(), 0);
}

#[test]
fn steady_series_has_no_outliers_at_all() {
    let df = bars_to_dataframe(&steady_table()).unwrap();
    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();

    // Range is ~1% of the low, volume constant, gaps ~1%.
    assert!(records.iter().all(|r| !r.any_outlier));
}

#[test]
fn or_identity_holds_for_every_row() {
    let mut bars = common::daily_bars("AAPL", &common::random_walk(11, 120));
    bars.extend(common::daily_bars("NVDA", &common::random_walk(12, 120)));
    // Inject anomalies: a volume spike and a wide bar.
    bars[30].volume = 250_000.0;
    bars[170].high = bars[170].low * 1.4;
    let df = bars_to_dataframe(&bars).unwrap();

    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();
    for record in &records {
        assert_eq!(
            record.any_outlier,
            record.price_outlier
                || record.range_outlier
                || record.volume_outlier
                || record.gap_outlier
        );
    }
    assert!(records.iter().any(|r| r.any_outlier));
}

#[test]
fn first_row_per_ticker_has_null_derived_fields_and_false_flags() {
    let mut bars = common::daily_bars("AAPL", &common::random_walk(21, 60));
    bars.extend(common::daily_bars("NVDA", &common::random_walk(22, 60)));
    let df = bars_to_dataframe(&bars).unwrap();

    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();

    for ticker in ["AAPL", "NVDA"] {
        let first = records
            .iter()
            .find(|r| r.ticker == ticker)
            .expect("ticker present");
        assert!(first.ret.is_nan());
        assert!(first.gap.is_nan());
        assert!(!first.price_outlier);
        assert!(!first.gap_outlier);
    }

    // Every non-first row has defined return and gap.
    let mut seen: std::collections::HashSet<&str> = Default::default();
    for record in &records {
        if seen.insert(record.ticker.as_str()) {
            continue;
        }
        assert!(!record.ret.is_nan());
        assert!(!record.gap.is_nan());
    }
}

#[test]
fn volume_spike_is_flagged_per_ticker() {
    // AAPL has a spike; NVDA's identical-looking volumes must stay clean.
    let mut aapl = common::daily_bars("AAPL", &common::random_walk(31, 80));
    for (i, bar) in aapl.iter_mut().enumerate() {
        bar.volume = 1000.0 + (i % 7) as f64 * 10.0;
    }
    aapl[40].volume = 1_000_000.0;
    let mut nvda = common::daily_bars("NVDA", &common::random_walk(32, 80));
    for (i, bar) in nvda.iter_mut().enumerate() {
        bar.volume = 1000.0 + (i % 7) as f64 * 10.0;
    }
    let mut bars = aapl;
    bars.extend(nvda);
    let df = bars_to_dataframe(&bars).unwrap();

    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();
    let flagged: Vec<_> = records.iter().filter(|r| r.volume_outlier).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].ticker, "AAPL");
    assert_eq!(flagged[0].volume, 1_000_000.0);
}

#[test]
fn single_jump_in_pooled_returns_is_a_price_outlier() {
    // Gentle noise plus one 25% jump: the pooled z-band flags exactly it.
    let mut closes: Vec<f64> = Vec::with_capacity(120);
    let mut value = 100.0;
    for i in 0..120 {
        value += if i == 60 { 25.0 } else { ((i % 5) as f64 - 2.0) * 0.1 };
        closes.push(value);
    }
    let df = bars_to_dataframe(&common::daily_bars("AAPL", &closes)).unwrap();

    let records = detect_outliers(&df, &OutlierParams::default()).unwrap();
    let flagged: Vec<_> = records.iter().filter(|r| r.price_outlier).collect();
    assert_eq!(flagged.len(), 1);
    assert!((flagged[0].close - closes[60]).abs() < 1e-9);
}
