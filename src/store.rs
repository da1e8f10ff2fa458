// src/store.rs
//! Append-only record store marking notifications as sent. The default
//! implementation is a JSON-lines file; the trait keeps the delivery loop
//! and the webhook handler swappable onto an in-memory store in tests.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sentiment::Sentiment;

pub const DEFAULT_RECORD_PATH: &str = "state/delivered.jsonl";

/// One delivered notification. Append-only, insertion-ordered; retention is
/// the store's own concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub headline: String,
    pub url: String,
    pub category: String,
    pub sentiment: Sentiment,
    pub timestamp: DateTime<Utc>,
}

pub trait RecordStore: Send + Sync {
    fn append(&self, record: &DeliveryRecord) -> Result<()>;
    fn latest(&self) -> Result<Option<DeliveryRecord>>;
}

/// File-backed store: one JSON object per line, appended atomically enough
/// for a single-writer process.
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonlStore {
    fn append(&self, record: &DeliveryRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent); // best-effort
        }
        let line = serde_json::to_string(record).context("serialize record")?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open record store {}", self.path.display()))?;
        writeln!(f, "{line}").context("append record")?;
        Ok(())
    }

    fn latest(&self) -> Result<Option<DeliveryRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("read record store"),
        };
        // Last parseable line wins; a torn trailing line is skipped.
        Ok(content
            .lines()
            .rev()
            .find_map(|l| serde_json::from_str(l).ok()))
    }
}

/// In-memory store for tests and tools.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<DeliveryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<DeliveryRecord> {
        self.records.lock().expect("store mutex").clone()
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, record: &DeliveryRecord) -> Result<()> {
        self.records.lock().expect("store mutex").push(record.clone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<DeliveryRecord>> {
        Ok(self.records.lock().expect("store mutex").last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(headline: &str) -> DeliveryRecord {
        DeliveryRecord {
            headline: headline.into(),
            url: format!("https://example.com/{headline}"),
            category: "general".into(),
            sentiment: Sentiment::Neutral,
            timestamp: Utc::now(),
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "news-courier-store-{tag}-{}.jsonl",
            std::process::id()
        ))
    }

    #[test]
    fn latest_is_none_on_missing_file() {
        let store = JsonlStore::new(temp_path("missing"));
        let _ = fs::remove_file(store.path());
        assert_eq!(store.latest().unwrap(), None);
    }

    #[test]
    fn append_then_latest_roundtrips_last_record() {
        let store = JsonlStore::new(temp_path("roundtrip"));
        let _ = fs::remove_file(store.path());

        store.append(&record("first")).unwrap();
        store.append(&record("second")).unwrap();

        let got = store.latest().unwrap().expect("a record");
        assert_eq!(got.headline, "second");

        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn torn_trailing_line_is_skipped() {
        let store = JsonlStore::new(temp_path("torn"));
        let _ = fs::remove_file(store.path());

        store.append(&record("whole")).unwrap();
        let mut f = OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        write!(f, "{{\"headline\": \"torn").unwrap();

        let got = store.latest().unwrap().expect("a record");
        assert_eq!(got.headline, "whole");

        let _ = fs::remove_file(store.path());
    }
}
