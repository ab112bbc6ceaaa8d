//! Twelve Data provider.
//!
//! Fetches OHLCV bars from the Twelve Data `time_series` endpoint. Handles
//! retries with exponential backoff and maps the vendor's error envelope to
//! typed errors. Deliberately not production-grade: no pagination beyond
//! `outputsize`, no per-plan credit accounting.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use super::provider::{BarProvider, ProviderBar, ProviderError};
use crate::domain::Interval;

/// Twelve Data `time_series` response envelope.
///
/// Successful responses carry `values`; errors carry `code`/`message` with
/// `status == "error"`.
#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    values: Option<Vec<TimeSeriesValue>>,
    status: Option<String>,
    code: Option<i64>,
    message: Option<String>,
}

/// One bar as Twelve Data returns it: every field is a string.
#[derive(Debug, Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: Option<String>,
}

/// Twelve Data provider.
pub struct TwelveDataProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl TwelveDataProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.twelvedata.com".to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Override the endpoint base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Vendor spelling of our interval keys.
    fn interval_param(interval: Interval) -> &'static str {
        match interval {
            Interval::M1 => "1min",
            Interval::M15 => "15min",
            Interval::H1 => "1h",
            Interval::D1 => "1day",
            Interval::W1 => "1week",
        }
    }

    fn series_url(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        format!(
            "{}/time_series?symbol={ticker}&interval={}\
             &start_date={}&end_date={}&outputsize=5000&apikey={}",
            self.base_url,
            Self::interval_param(interval),
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S"),
            self.api_key,
        )
    }

    fn parse_response(
        ticker: &str,
        resp: TimeSeriesResponse,
    ) -> Result<Vec<ProviderBar>, ProviderError> {
        if resp.status.as_deref() == Some("error") {
            let message = resp.message.unwrap_or_else(|| "unknown error".into());
            return Err(match resp.code {
                Some(429) => ProviderError::RateLimited { retry_after_secs: 60 },
                Some(401) => ProviderError::AuthenticationRequired(message),
                Some(400) | Some(404) => ProviderError::TickerNotFound {
                    ticker: ticker.to_string(),
                },
                _ => ProviderError::ResponseFormatChanged(message),
            });
        }

        let values = resp
            .values
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no values in response".into()))?;

        let mut bars = Vec::with_capacity(values.len());
        for value in values {
            let timestamp = parse_vendor_datetime(&value.datetime).ok_or_else(|| {
                ProviderError::ResponseFormatChanged(format!(
                    "unparseable datetime: {}",
                    value.datetime
                ))
            })?;
            bars.push(ProviderBar {
                timestamp,
                open: parse_price(&value.open, "open")?,
                high: parse_price(&value.high, "high")?,
                low: parse_price(&value.low, "low")?,
                close: parse_price(&value.close, "close")?,
                volume: value.volume.as_deref().and_then(|v| v.parse().ok()),
            });
        }

        // The vendor returns most-recent-first; normalize to ascending.
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn fetch_with_retry(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderBar>, ProviderError> {
        let url = self.series_url(ticker, interval, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(ProviderError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ProviderError::AuthenticationRequired(
                            "Twelve Data rejected the API key".into(),
                        ));
                    }

                    if !status.is_success() {
                        last_error =
                            Some(ProviderError::Other(format!("HTTP {status} for {ticker}")));
                        continue;
                    }

                    let body: TimeSeriesResponse = resp.json().map_err(|e| {
                        ProviderError::ResponseFormatChanged(format!(
                            "failed to parse response for {ticker}: {e}"
                        ))
                    })?;

                    return Self::parse_response(ticker, body);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(ProviderError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(ProviderError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Other("max retries exceeded".into())))
    }
}

/// Twelve Data sends `2024-01-02 15:30:00` for intraday and `2024-01-02` for
/// daily/weekly series. Timestamps are exchange-local in the vendor's default
/// configuration; we treat them as UTC instants, matching the stored contract.
fn parse_vendor_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn parse_price(raw: &str, field: &str) -> Result<f64, ProviderError> {
    raw.parse().map_err(|_| {
        ProviderError::ResponseFormatChanged(format!("unparseable {field}: {raw}"))
    })
}

impl BarProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        "twelvedata"
    }

    fn fetch(
        &self,
        ticker: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProviderBar>, ProviderError> {
        self.fetch_with_retry(ticker, interval, start, end)
    }
}
