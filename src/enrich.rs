// src/enrich.rs
//! Enrichment: sentiment label, synthesized summary, and optional voice
//! clip for one filtered headline. Every failure here degrades — a summary
//! falls back to a deterministic template, audio falls back to nothing —
//! so the item is always deliverable as text.

use std::sync::Arc;

use tracing::warn;

use crate::ai_adapter::DynGenerationClient;
use crate::ingest::types::HeadlineCandidate;
use crate::sentiment::{Sentiment, SentimentAnalyzer};
use crate::speech::{AudioClip, SpeechSynthesizer};

/// A filtered headline with everything attached that delivery needs.
#[derive(Debug, Clone)]
pub struct EnrichedNotification {
    pub headline: String,
    pub link: String,
    pub category: String,
    pub sentiment: Sentiment,
    pub summary_text: String,
    pub audio: Option<AudioClip>,
}

/// Summary length target, in words.
#[derive(Debug, Clone, Copy)]
pub struct SummaryLength {
    pub min_words: u32,
    pub max_words: u32,
}

impl Default for SummaryLength {
    fn default() -> Self {
        Self {
            min_words: 50,
            max_words: 100,
        }
    }
}

/// Deterministic summary used whenever the generation service fails.
/// Same inputs, same text — re-enriching an item is idempotent.
pub fn fallback_summary(location: &str, category: &str, headline: &str) -> String {
    format!("This news from {location} is about {category}: {headline}.")
}

pub fn summary_prompt(
    headline: &str,
    category: &str,
    location: &str,
    len: SummaryLength,
) -> String {
    format!(
        "Generate a 30–60-second summary ({}–{} words) of a news article with the headline '{}' related to {} in {}. Keep it concise and engaging.",
        len.min_words, len.max_words, headline, category, location
    )
}

pub struct EnrichmentPipeline {
    generation: DynGenerationClient,
    speech: Arc<dyn SpeechSynthesizer>,
    analyzer: SentimentAnalyzer,
    location: String,
    summary_len: SummaryLength,
}

impl EnrichmentPipeline {
    pub fn new(
        generation: DynGenerationClient,
        speech: Arc<dyn SpeechSynthesizer>,
        location: String,
        summary_len: SummaryLength,
    ) -> Self {
        Self {
            generation,
            speech,
            analyzer: SentimentAnalyzer::new(),
            location,
            summary_len,
        }
    }

    /// Request a summary; exactly one attempt, template fallback on any
    /// failure. Also used by the webhook's on-demand "more about" path.
    pub async fn summarize(&self, headline: &str, category: &str) -> String {
        let prompt = summary_prompt(headline, category, &self.location, self.summary_len);
        match self.generation.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, %headline, "summary failed, using template");
                fallback_summary(&self.location, category, headline)
            }
        }
    }

    /// Enrich one filtered headline. Sentiment is local and deterministic;
    /// summary and audio each get exactly one attempt.
    pub async fn enrich(&self, item: &HeadlineCandidate) -> EnrichedNotification {
        let sentiment = self.analyzer.classify(&item.text);
        let summary_text = self.summarize(&item.text, &item.category_hint).await;

        let audio = match self.speech.synthesize(&summary_text).await {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!(error = ?e, headline = %item.text, "speech synthesis failed, text-only");
                None
            }
        };

        EnrichedNotification {
            headline: item.text.clone(),
            link: item.source_url.clone(),
            category: item.category_hint.clone(),
            sentiment,
            summary_text,
            audio,
        }
    }
}
