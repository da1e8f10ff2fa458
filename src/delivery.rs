// src/delivery.rs
//! The delivery loop: collect → filter → (enrich → send → persist)* → done.
//! One linear pass per trigger; every per-item failure is contained so a
//! partial run never aborts the batch.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::config::InterestsHandle;
use crate::enrich::EnrichmentPipeline;
use crate::ingest::{self, types::HeadlineSource};
use crate::notify::{notification_text, Transport};
use crate::relevance::RelevanceFilter;
use crate::store::{DeliveryRecord, RecordStore};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("delivery_runs_total", "Delivery runs started.");
        describe_counter!("delivery_sent_total", "Notifications delivered (text at minimum).");
        describe_counter!(
            "delivery_skipped_total",
            "Items dropped because the text send failed."
        );
        describe_gauge!("delivery_last_run_ts", "Unix ts of the last delivery run.");
    });
}

/// Outcome counts of one run, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub collected: usize,
    pub filtered: usize,
    pub delivered: usize,
    pub skipped: usize,
}

/// Owns the pipeline's collaborators for the lifetime of the process.
pub struct Courier {
    sources: Vec<Box<dyn HeadlineSource>>,
    filter: RelevanceFilter,
    enricher: Arc<EnrichmentPipeline>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn RecordStore>,
    interests: InterestsHandle,
    chat_id: String,
    location: String,
}

impl Courier {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sources: Vec<Box<dyn HeadlineSource>>,
        filter: RelevanceFilter,
        enricher: Arc<EnrichmentPipeline>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn RecordStore>,
        interests: InterestsHandle,
        chat_id: String,
        location: String,
    ) -> Self {
        Self {
            sources,
            filter,
            enricher,
            transport,
            store,
            interests,
            chat_id,
            location,
        }
    }

    /// One delivery run. Reads a single interest-set snapshot up front;
    /// an empty collection or an empty filter result is a logged no-op,
    /// not an error.
    pub async fn run_once(&self) -> RunReport {
        ensure_metrics_described();
        counter!("delivery_runs_total").increment(1);
        gauge!("delivery_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        let interests = self.interests.snapshot();
        let mut report = RunReport::default();

        let candidates = ingest::collect(&self.sources, &interests).await;
        report.collected = candidates.len();
        if candidates.is_empty() {
            info!("no candidates collected, run ends");
            return report;
        }

        let filtered = self
            .filter
            .filter(&candidates, &interests, &self.location)
            .await;
        report.filtered = filtered.len();
        if filtered.is_empty() {
            info!("nothing passed the relevance filter, run ends");
            return report;
        }

        for item in &filtered {
            let enriched = self.enricher.enrich(item).await;
            let text = notification_text(&enriched);

            if let Err(e) = self.transport.send_text(&self.chat_id, &text).await {
                warn!(error = ?e, headline = %enriched.headline, "text send failed, item skipped");
                counter!("delivery_skipped_total").increment(1);
                report.skipped += 1;
                continue;
            }

            // Audio rides along only after the text made it; its failure
            // does not cost the item its record.
            if let Some(clip) = &enriched.audio {
                if let Err(e) = self.transport.send_audio(&self.chat_id, clip).await {
                    warn!(error = ?e, headline = %enriched.headline, "voice send failed");
                }
            }

            let record = DeliveryRecord {
                headline: enriched.headline.clone(),
                url: enriched.link.clone(),
                category: enriched.category.clone(),
                sentiment: enriched.sentiment,
                timestamp: Utc::now(),
            };
            if let Err(e) = self.store.append(&record) {
                warn!(error = ?e, "record append failed");
            }

            counter!("delivery_sent_total").increment(1);
            report.delivered += 1;
        }

        info!(
            collected = report.collected,
            filtered = report.filtered,
            delivered = report.delivered,
            skipped = report.skipped,
            "delivery run done"
        );
        report
    }
}
