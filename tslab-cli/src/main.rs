//! tslab CLI — data pipeline and analytics commands.
//!
//! Commands:
//! - `update` — fetch new bars from Twelve Data into the interval stores
//! - `clean` — run the cleaner over every interval store in place
//! - `inspect` — data-quality report (duplicates, gaps, irregular steps)
//! - `outliers` — flag return/range/volume/gap anomalies, optionally to CSV
//! - `segment` — kernel or PELT structural-break segmentation, optionally to CSV
//! - `stationarity` — ADF/KPSS verdicts per ticker × feature
//! - `forecast` — baseline forecast for one ticker, JSON to stdout

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use config::Config;
use tslab_core::analytics::{
    check_stationarity, detect_outliers, segment_kernel, segment_pelt, CostModel, KernelParams,
    OutlierParams, PeltParams, StationarityTest,
};
use tslab_core::data::{
    clean_all, inspect_interval, StdoutProgress, TableStore, TwelveDataProvider, Updater,
};
use tslab_core::domain::Interval;
use tslab_core::forecast::{run_forecast, ForecastModel};

#[derive(Parser)]
#[command(name = "tslab", about = "OHLCV time-series analytics toolkit")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "tslab.toml")]
    config: PathBuf,

    /// Override the data directory from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new bars for every interval and ticker, then clean the stores.
    Update {
        /// Tickers to update (defaults to the configured basket).
        #[arg(long, num_args = 1..)]
        tickers: Option<Vec<String>>,
    },
    /// Clean every interval store in place.
    Clean,
    /// Data-quality report over the stores.
    Inspect,
    /// Detect outliers over one interval's table.
    Outliers {
        /// Interval: 1m, 15m, 1h, 1d, 1w.
        #[arg(long, default_value = "1d")]
        interval: String,

        #[arg(long, default_value_t = 3.0)]
        price_z: f64,

        #[arg(long, default_value_t = 20.0)]
        range_threshold: f64,

        #[arg(long, default_value_t = 6.0)]
        volume_mad: f64,

        #[arg(long, default_value_t = 0.2)]
        gap_threshold: f64,

        /// Write the flagged records to this CSV file instead of a summary.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Segment price series into regimes.
    Segment {
        /// Algorithm: kernel (fixed count) or pelt (penalized).
        #[arg(long, default_value = "pelt")]
        algo: String,

        #[arg(long, default_value = "1d")]
        interval: String,

        /// Target columns (default: Close).
        #[arg(long, num_args = 1..)]
        target_cols: Option<Vec<String>>,

        /// Cost model / kernel: rbf or l2.
        #[arg(long, default_value = "rbf")]
        cost_model: String,

        /// Breakpoint count for the kernel algorithm.
        #[arg(long, default_value_t = 5)]
        n_bkps: usize,

        /// Penalty for the PELT algorithm.
        #[arg(long, default_value_t = 5.0)]
        penalty: f64,

        #[arg(long, default_value_t = 30)]
        min_size: usize,

        /// Observations considered per ticker (most recent first).
        #[arg(long, default_value_t = 2000)]
        max_obs: usize,

        /// Write the segmented rows to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Stationarity verdicts per ticker × feature.
    Stationarity {
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Test: ADF or KPSS.
        #[arg(long, default_value = "ADF")]
        test: String,

        #[arg(long, default_value_t = 0.05)]
        alpha: f64,

        /// Features to test (default: every numeric column).
        #[arg(long, num_args = 1..)]
        features: Option<Vec<String>>,

        /// Write verdicts to this CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Baseline forecast for one ticker over the daily table.
    Forecast {
        #[arg(long)]
        ticker: String,

        #[arg(long, default_value = "Close")]
        target: String,

        #[arg(long, default_value_t = 30)]
        horizon: usize,

        /// Model: naive, seasonal_naive, moving_average, drift, exp_smoothing.
        #[arg(long, default_value = "naive")]
        model: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let store = TableStore::new(&config.data_dir);

    match cli.command {
        Commands::Update { tickers } => update(&config, &store, tickers),
        Commands::Clean => clean(&store),
        Commands::Inspect => inspect(&store),
        Commands::Outliers {
            interval,
            price_z,
            range_threshold,
            volume_mad,
            gap_threshold,
            csv,
        } => {
            let params = OutlierParams {
                price_z,
                range_threshold,
                volume_mad,
                gap_threshold,
            };
            outliers(&store, &interval, &params, csv)
        }
        Commands::Segment {
            algo,
            interval,
            target_cols,
            cost_model,
            n_bkps,
            penalty,
            min_size,
            max_obs,
            csv,
        } => segment(
            &store,
            &algo,
            &interval,
            target_cols,
            &cost_model,
            n_bkps,
            penalty,
            min_size,
            max_obs,
            csv,
        ),
        Commands::Stationarity {
            interval,
            test,
            alpha,
            features,
            csv,
        } => stationarity(&store, &interval, &test, alpha, features, csv),
        Commands::Forecast {
            ticker,
            target,
            horizon,
            model,
        } => forecast(&store, &ticker, &target, horizon, &model),
    }
}

fn parse_interval(raw: &str) -> Result<Interval> {
    raw.parse::<Interval>().map_err(anyhow::Error::from)
}

fn update(config: &Config, store: &TableStore, tickers: Option<Vec<String>>) -> Result<()> {
    let api_key = config.api_key()?;
    let provider = TwelveDataProvider::new(api_key)?;
    let tickers = tickers.unwrap_or_else(|| config.tickers.clone());
    let pace = Duration::from_secs(config.pace_seconds);

    println!("Starting data update...\n");
    let updater = Updater::new(&provider, store, pace);
    let summary = updater.update_all(&tickers, &StdoutProgress);

    for outcome in &summary.intervals {
        match outcome {
            Ok(o) => {
                for (ticker, error) in &o.errors {
                    eprintln!("WARNING: {} {ticker}: {error}", o.interval);
                }
            }
            Err(e) => eprintln!("WARNING: interval update failed: {e}"),
        }
    }
    println!("\nUpdate & cleaning finished.");
    if !summary.all_succeeded() {
        bail!("update completed with errors");
    }
    Ok(())
}

fn clean(store: &TableStore) -> Result<()> {
    let outcomes = clean_all(store);
    if outcomes.is_empty() {
        println!("No stores to clean.");
        return Ok(());
    }
    for outcome in outcomes {
        match outcome.result {
            Ok((before, after)) => {
                println!("Cleaned: {} ({before} -> {after})", outcome.interval)
            }
            Err(e) => eprintln!("Failed to clean {}: {e}", outcome.interval),
        }
    }
    Ok(())
}

fn inspect(store: &TableStore) -> Result<()> {
    for interval in Interval::ALL {
        println!("\n{}", "=".repeat(50));
        println!("CHECK {interval} ({})", interval.file_name());
        println!("{}", "=".repeat(50));

        let df = match store.read(interval) {
            Ok(df) => df,
            Err(e) => {
                println!("skipped: {e}");
                continue;
            }
        };
        let report = inspect_interval(&df, interval)?;
        println!("rows: {}", report.rows);
        println!("duplicates: {}", report.duplicate_keys);
        for ticker in &report.tickers {
            if ticker.irregular_steps > 0 {
                println!(
                    "  {}: {} irregular steps (max {}h)",
                    ticker.ticker, ticker.irregular_steps, ticker.max_step_hours
                );
            } else {
                println!("  {}: OK ({} bars)", ticker.ticker, ticker.bars);
            }
        }
    }
    Ok(())
}

fn outliers(
    store: &TableStore,
    interval: &str,
    params: &OutlierParams,
    csv: Option<PathBuf>,
) -> Result<()> {
    let interval = parse_interval(interval)?;
    let df = store.read(interval)?;
    let records = detect_outliers(&df, params)?;

    if let Some(path) = csv {
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        println!("Wrote {} records to {}", records.len(), path.display());
    } else {
        let flagged = records.iter().filter(|r| r.any_outlier).count();
        println!("{} rows, {flagged} flagged as outliers", records.len());
        for record in records.iter().filter(|r| r.any_outlier) {
            println!(
                "{} {} price={} range={} volume={} gap={}",
                record.ticker,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.price_outlier as u8,
                record.range_outlier as u8,
                record.volume_outlier as u8,
                record.gap_outlier as u8,
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn segment(
    store: &TableStore,
    algo: &str,
    interval: &str,
    target_cols: Option<Vec<String>>,
    cost_model: &str,
    n_bkps: usize,
    penalty: f64,
    min_size: usize,
    max_obs: usize,
    csv: Option<PathBuf>,
) -> Result<()> {
    let interval = parse_interval(interval)?;
    let df = store.read(interval)?;
    let model: CostModel = cost_model.parse()?;
    let target_cols = target_cols.unwrap_or_else(|| vec!["Close".to_string()]);

    let segmented = match algo {
        "kernel" => segment_kernel(
            &df,
            &KernelParams {
                target_cols,
                kernel: model,
                n_bkps,
                min_size,
                max_obs,
            },
        )?,
        "pelt" => segment_pelt(
            &df,
            &PeltParams {
                target_cols,
                cost_model: model,
                penalty,
                min_size,
                max_obs,
            },
        )?,
        other => bail!("unknown algorithm '{other}' (expected 'kernel' or 'pelt')"),
    };

    let changepoints = segmented.column("changepoint")?.i32()?.clone();
    let segment_ids = segmented.column("segment_id")?.i32()?.clone();
    let bars = tslab_core::data::dataframe_to_bars(&segmented)?;

    if let Some(path) = csv {
        #[derive(serde::Serialize)]
        struct SegmentRow<'a> {
            date: String,
            ticker: &'a str,
            close: f64,
            changepoint: i32,
            segment_id: i32,
        }
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for (i, bar) in bars.iter().enumerate() {
            writer.serialize(SegmentRow {
                date: bar.timestamp.format("%Y-%m-%d %H:%M").to_string(),
                ticker: &bar.ticker,
                close: bar.close,
                changepoint: changepoints.get(i).unwrap_or(0),
                segment_id: segment_ids.get(i).unwrap_or(0),
            })?;
        }
        writer.flush()?;
        println!("Wrote {} rows to {}", bars.len(), path.display());
    } else {
        for (i, bar) in bars.iter().enumerate() {
            if changepoints.get(i) == Some(1) {
                println!(
                    "{} regime boundary at {} (close {})",
                    bar.ticker,
                    bar.timestamp.format("%Y-%m-%d"),
                    bar.close
                );
            }
        }
    }
    Ok(())
}

fn stationarity(
    store: &TableStore,
    interval: &str,
    test: &str,
    alpha: f64,
    features: Option<Vec<String>>,
    csv: Option<PathBuf>,
) -> Result<()> {
    let interval = parse_interval(interval)?;
    let test: StationarityTest = test.parse()?;
    let df = store.read(interval)?;
    let verdicts = check_stationarity(&df, features.as_deref(), test, alpha)?;

    if let Some(path) = csv {
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for verdict in &verdicts {
            writer.serialize(verdict)?;
        }
        writer.flush()?;
        println!("Wrote {} verdicts to {}", verdicts.len(), path.display());
    } else {
        println!(
            "{:<8} {:<10} {:<6} {:>12} {:>10} stationary",
            "ticker", "feature", "test", "statistic", "p-value"
        );
        for v in &verdicts {
            println!(
                "{:<8} {:<10} {:<6} {:>12.4} {:>10.4} {}",
                v.ticker,
                v.feature,
                v.test.as_str(),
                v.statistic,
                v.p_value,
                v.is_stationary as u8
            );
        }
    }
    Ok(())
}

fn forecast(
    store: &TableStore,
    ticker: &str,
    target: &str,
    horizon: usize,
    model: &str,
) -> Result<()> {
    let model: ForecastModel = model.parse()?;
    let df = store.read(Interval::D1)?;
    let points = run_forecast(&df, ticker, target, horizon, model)?;

    let body = json!({
        "status": "ok",
        "ticker": ticker,
        "target": target,
        "model": model,
        "horizon": horizon,
        "forecast": points
            .iter()
            .map(|p| json!({
                "date": p.date.format("%Y-%m-%d").to_string(),
                "value": p.value,
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
