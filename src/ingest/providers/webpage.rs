// src/ingest/providers/webpage.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use scraper::{Html, Selector};
use std::time::Duration;

use crate::ingest::normalize_text;
use crate::ingest::types::{HeadlineCandidate, HeadlineSource};

/// How many headings we keep per page.
const PER_PAGE_CAP: usize = 5;

/// Scraping provider over a fixed list of news pages. Each page contributes
/// at most [`PER_PAGE_CAP`] heading elements; a page that fails to fetch or
/// parse contributes nothing and never aborts the rest of the list.
pub struct WebPageProvider {
    http: reqwest::Client,
    urls: Vec<String>,
    selector: String,
}

impl WebPageProvider {
    pub fn new(urls: Vec<String>, selector: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-courier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            urls,
            selector,
        }
    }

    async fn scrape_page(&self, url: &str) -> Result<Vec<HeadlineCandidate>> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("page fetch")?
            .error_for_status()
            .context("page non-2xx")?;
        let body = resp.text().await.context("page body")?;

        // `Html` is !Send, so all parsing happens in this synchronous helper
        // with no await in scope.
        let headings = extract_headings(&body, &self.selector, PER_PAGE_CAP)?;

        Ok(headings
            .into_iter()
            .map(|text| HeadlineCandidate {
                text,
                source_url: url.to_string(),
                category_hint: "general".to_string(),
            })
            .collect())
    }
}

/// Extract up to `cap` non-empty, normalized heading texts from raw HTML.
fn extract_headings(html: &str, selector: &str, cap: usize) -> Result<Vec<String>> {
    let sel = Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("invalid heading selector `{selector}`: {e}"))?;
    let doc = Html::parse_document(html);

    let mut out = Vec::new();
    for el in doc.select(&sel) {
        let text = normalize_text(&el.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        out.push(text);
        if out.len() >= cap {
            break;
        }
    }
    Ok(out)
}

#[async_trait]
impl HeadlineSource for WebPageProvider {
    async fn fetch(&self, _interests: &[String]) -> Result<Vec<HeadlineCandidate>> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();

        for url in &self.urls {
            match self.scrape_page(url).await {
                Ok(mut v) => out.append(&mut v),
                Err(e) => {
                    tracing::warn!(error = ?e, %url, "page scrape failed, skipping");
                    counter!("collect_page_errors_total").increment(1);
                }
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("collect_source_ms").record(ms);
        counter!("collect_candidates_total").increment(out.len() as u64);

        Ok(out)
    }

    fn name(&self) -> &'static str {
        "webpage"
    }
}
