// src/ingest/types.rs
use anyhow::Result;

/// A raw, unfiltered headline pulled from any source.
/// Identity is structural (text + url); collection makes no dedup guarantee.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct HeadlineCandidate {
    pub text: String,          // normalized headline text
    pub source_url: String,    // article link, or the page it was scraped from
    pub category_hint: String, // interest term for API hits, "general" for scraped pages
}

#[async_trait::async_trait]
pub trait HeadlineSource: Send + Sync {
    /// Fetch the source's current candidates. Interests are passed through so
    /// query-driven sources can fan out per term; page sources ignore them.
    async fn fetch(&self, interests: &[String]) -> Result<Vec<HeadlineCandidate>>;
    fn name(&self) -> &'static str;
}
