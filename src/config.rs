// src/config.rs
//! Courier configuration: a TOML file for the tunables, environment
//! variables for secrets, and a swappable snapshot handle for the one piece
//! of runtime-mutable state (the interest set).

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::warn;

// --- env defaults & names ---
pub const DEFAULT_CONFIG_PATH: &str = "config/courier.toml";
pub const ENV_CONFIG_PATH: &str = "COURIER_CONFIG_PATH";

fn default_batch_size() -> usize {
    10
}
fn default_fallback_count() -> usize {
    10
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_base_secs() -> u64 {
    5
}
fn default_language() -> String {
    "en".to_string()
}
fn default_search_sources() -> String {
    "bbc-news,cnn".to_string()
}
fn default_voice_name() -> String {
    "en-US-Standard-C".to_string()
}
fn default_summary_min_words() -> u32 {
    50
}
fn default_summary_max_words() -> u32 {
    100
}
fn default_heading_selector() -> String {
    "h2".to_string()
}
fn default_record_path() -> String {
    crate::store::DEFAULT_RECORD_PATH.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourierConfig {
    /// Destination chat for scheduled notifications.
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_fallback_count")]
    pub fallback_count: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    /// Local times of day ("HH:MM") when a delivery run is due.
    #[serde(default)]
    pub notification_times: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub source_urls: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Comma-separated outlet ids passed to the news-search API.
    #[serde(default = "default_search_sources")]
    pub search_sources: String,
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_summary_min_words")]
    pub summary_min_words: u32,
    #[serde(default = "default_summary_max_words")]
    pub summary_max_words: u32,
    #[serde(default = "default_heading_selector")]
    pub heading_selector: String,
    #[serde(default = "default_record_path")]
    pub record_path: String,
}

impl Default for CourierConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config deserializes via serde defaults")
    }
}

impl CourierConfig {
    /// Load from COURIER_CONFIG_PATH (default `config/courier.toml`).
    /// A missing or unparseable file logs and falls back to defaults — boot
    /// never dies on config, it just runs idle until configured.
    pub fn load() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<CourierConfig>(&content) {
                Ok(cfg) => cfg.sanitized(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "config parse failed, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str::<CourierConfig>(content)?.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.batch_size == 0 {
            self.batch_size = default_batch_size();
        }
        if self.max_attempts == 0 {
            self.max_attempts = default_max_attempts();
        }
        if self.summary_min_words > self.summary_max_words {
            std::mem::swap(&mut self.summary_min_words, &mut self.summary_max_words);
        }
        self.interests = normalize_terms(self.interests);
        self
    }

    /// Parsed notification times; entries that don't parse are logged and
    /// dropped rather than killing the schedule.
    pub fn parsed_notification_times(&self) -> Vec<NaiveTime> {
        self.notification_times
            .iter()
            .filter_map(|raw| match NaiveTime::parse_from_str(raw, "%H:%M") {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!(entry = %raw, error = %e, "unparseable notification time, dropped");
                    None
                }
            })
            .collect()
    }
}

/// Trim, drop empties.
pub fn normalize_terms(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/* ----------------------------
Shared interest-set snapshot
---------------------------- */

/// Thread-safe handle over the interest set. Readers take one immutable
/// snapshot per run; the webhook handler replaces the whole vector in a
/// single swap, so a reader never observes a half-updated set.
#[derive(Clone)]
pub struct InterestsHandle {
    inner: Arc<RwLock<Arc<Vec<String>>>>,
}

impl InterestsHandle {
    pub fn new(interests: Vec<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(interests))),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.inner.read().expect("interests lock poisoned").clone()
    }

    pub fn replace(&self, interests: Vec<String>) {
        let next = Arc::new(normalize_terms(interests));
        *self.inner.write().expect("interests lock poisoned") = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let cfg = CourierConfig::default();
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.fallback_count, 10);
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.backoff_base_secs, 5);
        assert_eq!(cfg.language, "en");
        assert_eq!(cfg.heading_selector, "h2");
        assert!(cfg.notification_times.is_empty());
    }

    #[test]
    fn toml_overrides_and_sanitizes() {
        let cfg = CourierConfig::from_toml_str(
            r#"
            chat_id = "12345"
            batch_size = 0
            interests = [" cricket ", "", "tech"]
            notification_times = ["08:00", "nope", "19:30"]
            summary_min_words = 120
            summary_max_words = 80
            "#,
        )
        .unwrap();
        assert_eq!(cfg.chat_id, "12345");
        assert_eq!(cfg.batch_size, 10); // zero is nonsense, reset
        assert_eq!(cfg.interests, vec!["cricket".to_string(), "tech".into()]);
        assert_eq!(cfg.parsed_notification_times().len(), 2);
        assert!(cfg.summary_min_words <= cfg.summary_max_words);
    }

    #[test]
    fn interests_swap_is_atomic_for_existing_snapshots() {
        let handle = InterestsHandle::new(vec!["a".into(), "b".into()]);
        let before = handle.snapshot();
        handle.replace(vec!["x".into()]);
        // The old snapshot is untouched; a fresh one sees the new set.
        assert_eq!(*before, vec!["a".to_string(), "b".into()]);
        assert_eq!(*handle.snapshot(), vec!["x".to_string()]);
    }
}
