//! CLI configuration, loaded from `tslab.toml` when present.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The tracked equity basket and pipeline settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the per-interval parquet stores.
    pub data_dir: PathBuf,
    /// Tickers the update pipeline maintains.
    pub tickers: Vec<String>,
    /// Environment variable holding the Twelve Data API key.
    pub api_key_env: String,
    /// Fixed sleep between provider calls, in seconds.
    pub pace_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tickers: [
                "AAPL", "NVDA", "TSLA", "MSFT", "AMZN", "INTC", "COST", "META", "AMD", "MCD",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            api_key_env: "TWELVEDATA_API_KEY".to_string(),
            pace_seconds: 7,
        }
    }
}

impl Config {
    /// Load from a TOML file, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .with_context(|| format!("environment variable {} not set", self.api_key_env))
    }
}
