// src/relevance.rs
//! Relevance filter: batch partitioning, prompt building, selection parsing,
//! and the rate-limit-aware retry loop around the generation service.

use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::ai_adapter::{DynGenerationClient, GenerateError};
use crate::ingest::types::HeadlineCandidate;

// --- env names & defaults ---
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_FALLBACK_COUNT: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 5;

pub const ENV_DEV_LOG: &str = "COURIER_DEV_LOG";

/// Tunables for one filter pass. All defaults mirror the configuration
/// surface: batch of 10, fallback of 10, 3 attempts, 5 s backoff base.
#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    pub batch_size: usize,
    pub fallback_count: usize,
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            fallback_count: DEFAULT_FALLBACK_COUNT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
        }
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relevance_batches_total", "Batches sent to the generation service.");
        describe_counter!(
            "relevance_batch_retries_total",
            "Rate-limited batch attempts that were retried."
        );
        describe_counter!(
            "relevance_batches_abandoned_total",
            "Batches dropped after exhausted retries or hard failure."
        );
        describe_counter!(
            "relevance_fallback_runs_total",
            "Filter passes that fell back to the unfiltered subset."
        );
        describe_counter!("relevance_selected_total", "Headlines selected as relevant.");
    });
}

// Dev logging gate: COURIER_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

// Short anonymized id so dev logs never carry raw headline text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Build the per-batch prompt: interests, location, and the batch's
/// headlines enumerated 1..k. The numbering is batch-local; the reply's
/// indices are mapped back through the same batch, never the global list.
pub fn build_prompt(interests: &[String], location: &str, batch: &[HeadlineCandidate]) -> String {
    let headlines_text = batch
        .iter()
        .enumerate()
        .map(|(j, c)| format!("{}. {}", j + 1, c.text))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Which of these headlines relate to {} in {}? List the numbers of relevant headlines.\nHeadlines:\n{}",
        interests.join(", "),
        location,
        headlines_text
    )
}

/// Extract the selected 1-based indices from a free-form model reply.
///
/// Every run of digits is considered; values outside `[1, max_index]` are
/// ignored, duplicates collapse, and the result is ascending so selection
/// order always mirrors original candidate order.
pub fn parse_selection(text: &str, max_index: usize) -> Vec<usize> {
    static RE_INT: OnceCell<Regex> = OnceCell::new();
    let re = RE_INT.get_or_init(|| Regex::new(r"\d+").unwrap());

    let mut out: Vec<usize> = re
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= max_index)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Delay slept after rate-limited attempt `attempt` (0-based):
/// `base * 2^attempt` seconds plus jitter in `[0, 1)` seconds.
pub fn backoff_delay(base_secs: u64, attempt: u32) -> Duration {
    let scaled = base_secs.saturating_mul(1u64 << attempt.min(16));
    let jitter: f64 = rand::random::<f64>();
    Duration::from_secs_f64(scaled as f64 + jitter)
}

/// The relevance filter. Owns nothing but a generation client handle and
/// its tunables; candidates pass through by value.
pub struct RelevanceFilter {
    client: DynGenerationClient,
    cfg: FilterConfig,
}

impl RelevanceFilter {
    pub fn new(client: DynGenerationClient, cfg: FilterConfig) -> Self {
        Self { client, cfg }
    }

    /// One filter pass over `candidates`.
    ///
    /// Batches are independent: a batch that exhausts its retries or hits a
    /// non-rate-limit error is abandoned and the pass moves on. Only when
    /// the accumulated selection ends up empty does the pass fall back to
    /// the first `fallback_count` candidates in original order.
    pub async fn filter(
        &self,
        candidates: &[HeadlineCandidate],
        interests: &[String],
        location: &str,
    ) -> Vec<HeadlineCandidate> {
        ensure_metrics_described();

        let batch_size = self.cfg.batch_size.max(1);
        let mut selected: Vec<HeadlineCandidate> = Vec::new();

        for (bi, batch) in candidates.chunks(batch_size).enumerate() {
            counter!("relevance_batches_total").increment(1);
            let prompt = build_prompt(interests, location, batch);

            match self.run_batch(&prompt, bi + 1).await {
                Some(reply) => {
                    for idx in parse_selection(&reply, batch.len()) {
                        let cand = &batch[idx - 1];
                        if dev_logging_enabled() {
                            debug!(
                                target: "relevance",
                                id = %anon_hash(&cand.text),
                                batch = bi + 1,
                                idx,
                                "selected"
                            );
                        }
                        selected.push(cand.clone());
                    }
                }
                None => {
                    counter!("relevance_batches_abandoned_total").increment(1);
                }
            }
        }

        if selected.is_empty() && !candidates.is_empty() {
            warn!(
                fallback = self.cfg.fallback_count.min(candidates.len()),
                "no headlines selected, using unfiltered fallback"
            );
            counter!("relevance_fallback_runs_total").increment(1);
            selected = candidates
                .iter()
                .take(self.cfg.fallback_count)
                .cloned()
                .collect();
        }

        counter!("relevance_selected_total").increment(selected.len() as u64);
        info!(selected = selected.len(), total = candidates.len(), "filter pass done");
        selected
    }

    /// Drive one batch to completion: up to `max_attempts` tries, sleeping
    /// the exponential backoff after each rate-limited attempt. Returns the
    /// service reply, or None when the batch is abandoned.
    async fn run_batch(&self, prompt: &str, batch_no: usize) -> Option<String> {
        for attempt in 0..self.cfg.max_attempts {
            match self.client.generate(prompt).await {
                Ok(reply) => return Some(reply),
                Err(GenerateError::RateLimited) => {
                    let delay = backoff_delay(self.cfg.backoff_base_secs, attempt);
                    warn!(
                        batch = batch_no,
                        attempt = attempt + 1,
                        delay_s = format!("{:.2}", delay.as_secs_f64()),
                        "rate limit hit, backing off"
                    );
                    counter!("relevance_batch_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(GenerateError::Failed(e)) => {
                    error!(batch = batch_no, error = ?e, "generation error, abandoning batch");
                    return None;
                }
            }
        }
        error!(
            batch = batch_no,
            attempts = self.cfg.max_attempts,
            "batch abandoned after exhausted retries"
        );
        None
    }
}
