// src/ingest/providers/newsapi.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::normalize_text;
use crate::ingest::types::{HeadlineCandidate, HeadlineSource};

/// How many articles we keep per interest term.
const PER_TERM_CAP: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
}

/// Structured news-search provider (NewsAPI `everything` endpoint).
/// One query per interest term; a failing term is logged and skipped so a
/// single bad query never aborts the whole collection.
pub struct NewsApiProvider {
    http: reqwest::Client,
    api_key: String,
    sources: String,
    language: String,
}

impl NewsApiProvider {
    pub fn new(api_key: String, sources: String, language: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-courier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            sources,
            language,
        }
    }

    pub fn from_env(sources: String, language: String) -> Self {
        let api_key = std::env::var("NEWSAPI_KEY").unwrap_or_default();
        Self::new(api_key, sources, language)
    }

    async fn search_term(&self, term: &str) -> Result<Vec<HeadlineCandidate>> {
        let resp = self
            .http
            .get("https://newsapi.org/v2/everything")
            .query(&[
                ("q", term),
                ("sources", self.sources.as_str()),
                ("language", self.language.as_str()),
                ("apiKey", self.api_key.as_str()),
            ])
            .send()
            .await
            .context("newsapi request")?
            .error_for_status()
            .context("newsapi non-2xx")?;

        let body: SearchResponse = resp.json().await.context("newsapi json")?;

        let mut out = Vec::new();
        for article in body.articles.into_iter().take(PER_TERM_CAP) {
            let text = normalize_text(article.title.as_deref().unwrap_or_default());
            let Some(url) = article.url else { continue };
            if text.is_empty() {
                continue;
            }
            out.push(HeadlineCandidate {
                text,
                source_url: url,
                category_hint: term.to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl HeadlineSource for NewsApiProvider {
    async fn fetch(&self, interests: &[String]) -> Result<Vec<HeadlineCandidate>> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();

        for term in interests {
            match self.search_term(term).await {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, %term, "newsapi term failed, skipping");
                    counter!("collect_term_errors_total").increment(1);
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collect_source_ms").record(ms);
        counter!("collect_candidates_total").increment(out.len() as u64);

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
