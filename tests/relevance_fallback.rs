// tests/relevance_fallback.rs
//
// Fallback behavior: when filtering selects nothing — whether the service
// answered with no numbers or every batch died — the pass degrades to the
// first `fallback_count` candidates in original order.

use std::sync::Arc;

use news_courier::ai_adapter::{MockClient, MockFailure};
use news_courier::ingest::types::HeadlineCandidate;
use news_courier::relevance::{FilterConfig, RelevanceFilter};

fn cands(n: usize) -> Vec<HeadlineCandidate> {
    (1..=n)
        .map(|i| HeadlineCandidate {
            text: format!("headline {i}"),
            source_url: format!("https://example.com/{i}"),
            category_hint: "general".into(),
        })
        .collect()
}

#[tokio::test]
async fn empty_selection_falls_back_to_first_ten_in_order() {
    // Two batches, both answered, neither selects anything.
    let client = Arc::new(MockClient::always("none of these are relevant".into()));
    let filter = RelevanceFilter::new(client, FilterConfig::default());

    let list = cands(17);
    let got = filter.filter(&list, &["x".into()], "Pune").await;

    assert_eq!(got.len(), 10);
    for (i, c) in got.iter().enumerate() {
        assert_eq!(c.text, format!("headline {}", i + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn all_batches_failing_also_falls_back() {
    let script = vec![
        Err(MockFailure::Other),       // batch 1 abandoned outright
        Err(MockFailure::RateLimited), // batch 2 burns its retries
        Err(MockFailure::RateLimited),
        Err(MockFailure::RateLimited),
    ];
    let filter = RelevanceFilter::new(
        Arc::new(MockClient::scripted(script)),
        FilterConfig::default(),
    );

    let list = cands(12);
    let got = filter.filter(&list, &["x".into()], "Pune").await;
    assert_eq!(got.len(), 10);
    assert_eq!(got[0].text, "headline 1");
    assert_eq!(got[9].text, "headline 10");
}

#[tokio::test]
async fn fallback_is_capped_by_candidate_count() {
    let client = Arc::new(MockClient::always("no".into()));
    let filter = RelevanceFilter::new(client, FilterConfig::default());

    let list = cands(4);
    let got = filter.filter(&list, &["x".into()], "Pune").await;
    assert_eq!(got.len(), 4);
}

#[tokio::test]
async fn no_candidates_means_no_fallback() {
    let client = Arc::new(MockClient::always("1 2 3".into()));
    let filter = RelevanceFilter::new(client, FilterConfig::default());

    let got = filter.filter(&[], &["x".into()], "Pune").await;
    assert!(got.is_empty());
}

#[tokio::test]
async fn successful_selection_skips_the_fallback() {
    let client = Arc::new(MockClient::always("1 and also 3".into()));
    let filter = RelevanceFilter::new(client, FilterConfig::default());

    let list = cands(5);
    let got = filter.filter(&list, &["x".into()], "Pune").await;
    let texts: Vec<&str> = got.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["headline 1", "headline 3"]);
}
