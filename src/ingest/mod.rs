// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{HeadlineCandidate, HeadlineSource};
use metrics::{counter, describe_counter, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collect_candidates_total",
            "Headline candidates pulled from sources."
        );
        describe_counter!(
            "collect_term_errors_total",
            "Interest terms skipped due to search API errors."
        );
        describe_counter!(
            "collect_page_errors_total",
            "Source pages skipped due to fetch/parse errors."
        );
        describe_counter!(
            "collect_source_errors_total",
            "Whole-source fetch failures."
        );
        describe_histogram!("collect_source_ms", "Per-source fetch time in milliseconds.");
    });
}

/// Normalize headline text: decode entities, strip tags, collapse whitespace,
/// trim stray trailing punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Strip trailing sentence punctuation (keep quotes)
    while let Some(last) = out.chars().last() {
        if matches!(last, '!' | '?' | '.' | ',') {
            out.pop();
        } else {
            break;
        }
    }

    // 6) Length cap: headlines, not articles
    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }

    out
}

/// Pull candidates from every source in order. A failing source contributes
/// nothing; the rest of the list still runs. Result order is append order of
/// processing, nothing more.
pub async fn collect(
    sources: &[Box<dyn HeadlineSource>],
    interests: &[String],
) -> Vec<HeadlineCandidate> {
    ensure_metrics_described();

    let mut all = Vec::new();
    for s in sources {
        match s.fetch(interests).await {
            Ok(mut v) => all.append(&mut v),
            Err(e) => {
                tracing::warn!(error = ?e, source = s.name(), "source error");
                counter!("collect_source_errors_total").increment(1);
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    gauge!("collect_last_run_ts").set(now as f64);
    tracing::info!(candidates = all.len(), "collection finished");

    all
}
