//! Per-interval parquet store for canonical tables.
//!
//! Layout: `{data_dir}/{interval.file_name()}` plus a `*.meta.json` sidecar
//! (row count, tickers, blake3 content hash, written-at). Writes are
//! full-overwrite and atomic: the parquet bytes are staged to a `.tmp` file
//! and renamed into place. Readers get an eventually-consistent snapshot;
//! the store offers no protection against a writer racing a reader beyond
//! the atomic rename.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Interval;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no table stored for interval '{interval}'")]
    NotFound { interval: Interval },

    #[error("store I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("meta sidecar error: {0}")]
    Meta(String),
}

/// Metadata sidecar for one interval store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub interval: String,
    pub rows: usize,
    pub tickers: Vec<String>,
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// The per-interval table store.
pub struct TableStore {
    data_dir: PathBuf,
}

impl TableStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn table_path(&self, interval: Interval) -> PathBuf {
        self.data_dir.join(interval.file_name())
    }

    fn meta_path(&self, interval: Interval) -> PathBuf {
        self.data_dir
            .join(format!("{}.meta.json", interval.file_name()))
    }

    pub fn exists(&self, interval: Interval) -> bool {
        self.table_path(interval).exists()
    }

    /// Read the canonical table for an interval.
    pub fn read(&self, interval: Interval) -> Result<DataFrame, StoreError> {
        let path = self.table_path(interval);
        if !path.exists() {
            return Err(StoreError::NotFound { interval });
        }
        let file = fs::File::open(&path).map_err(|e| StoreError::Io(format!("open: {e}")))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet(format!("read: {e}")))
    }

    /// Overwrite the interval's table. Atomic: stage to .tmp, rename.
    pub fn write(&self, interval: Interval, df: &DataFrame) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::Io(format!("create dir: {e}")))?;

        let mut buf = Vec::new();
        ParquetWriter::new(&mut buf)
            .finish(&mut df.clone())
            .map_err(|e| StoreError::Parquet(format!("write: {e}")))?;

        let path = self.table_path(interval);
        let tmp_path = path.with_extension("parquet.tmp");
        fs::write(&tmp_path, &buf).map_err(|e| StoreError::Io(format!("stage: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::Io(format!("atomic rename failed: {e}"))
        })?;

        let meta = StoreMeta {
            interval: interval.as_str().to_string(),
            rows: df.height(),
            tickers: table_tickers(df),
            data_hash: blake3::hash(&buf).to_hex().to_string(),
            written_at: chrono::Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Meta(format!("serialize: {e}")))?;
        fs::write(self.meta_path(interval), meta_json)
            .map_err(|e| StoreError::Meta(format!("write: {e}")))?;

        Ok(())
    }

    /// Metadata sidecar for an interval, if present and parseable.
    pub fn meta(&self, interval: Interval) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.meta_path(interval)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

fn table_tickers(df: &DataFrame) -> Vec<String> {
    let mut tickers = BTreeSet::new();
    if let Ok(ca) = df.column(super::schema::TICKER).and_then(|c| c.str()) {
        for ticker in ca.iter().flatten() {
            tickers.insert(ticker.to_string());
        }
    }
    tickers.into_iter().collect()
}
