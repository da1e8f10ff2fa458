// tests/delivery_e2e.rs
//
// End-to-end delivery runs against in-crate mocks: fixed headline sources,
// a scripted generation client, a controllable transport, and the
// in-memory record store. No sockets, no live services.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use news_courier::ai_adapter::{MockClient, MockFailure};
use news_courier::config::InterestsHandle;
use news_courier::delivery::Courier;
use news_courier::enrich::{EnrichmentPipeline, SummaryLength};
use news_courier::ingest::types::{HeadlineCandidate, HeadlineSource};
use news_courier::notify::Transport;
use news_courier::relevance::{FilterConfig, RelevanceFilter};
use news_courier::speech::{AudioClip, SpeechSynthesizer};
use news_courier::store::MemoryStore;

struct FixedSource(Vec<HeadlineCandidate>);

#[async_trait]
impl HeadlineSource for FixedSource {
    async fn fetch(&self, _interests: &[String]) -> Result<Vec<HeadlineCandidate>> {
        Ok(self.0.clone())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Captures sends; optionally fails the first N text sends.
#[derive(Default)]
struct RecordingTransport {
    texts: Mutex<Vec<(String, String)>>,
    audio_sends: Mutex<usize>,
    fail_first_texts: Mutex<usize>,
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        {
            let mut remaining = self.fail_first_texts.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                anyhow::bail!("simulated text send failure");
            }
        }
        self.texts
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_audio(&self, _chat_id: &str, _clip: &AudioClip) -> Result<()> {
        *self.audio_sends.lock().unwrap() += 1;
        Ok(())
    }
}

struct StubSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for StubSpeech {
    async fn synthesize(&self, _text: &str) -> Result<AudioClip> {
        if self.fail {
            anyhow::bail!("simulated synthesis failure");
        }
        Ok(AudioClip {
            bytes: vec![0u8; 16],
            duration_hint_secs: 30,
        })
    }
    fn name(&self) -> &'static str {
        "stub"
    }
}

fn cands(n: usize) -> Vec<HeadlineCandidate> {
    (1..=n)
        .map(|i| HeadlineCandidate {
            text: format!("headline {i}"),
            source_url: format!("https://example.com/{i}"),
            category_hint: "general".into(),
        })
        .collect()
}

#[allow(clippy::type_complexity)]
fn build_courier(
    candidates: Vec<HeadlineCandidate>,
    script: Vec<std::result::Result<String, MockFailure>>,
    speech_fails: bool,
    fail_first_texts: usize,
) -> (Arc<Courier>, Arc<RecordingTransport>, Arc<MemoryStore>) {
    let generation = Arc::new(MockClient::scripted(script));
    let transport = Arc::new(RecordingTransport {
        fail_first_texts: Mutex::new(fail_first_texts),
        ..RecordingTransport::default()
    });
    let store = Arc::new(MemoryStore::new());
    let speech = Arc::new(StubSpeech { fail: speech_fails });

    let filter = RelevanceFilter::new(generation.clone(), FilterConfig::default());
    let enricher = Arc::new(EnrichmentPipeline::new(
        generation,
        speech,
        "Pune".into(),
        SummaryLength::default(),
    ));
    let sources: Vec<Box<dyn HeadlineSource>> = vec![Box::new(FixedSource(candidates))];

    let courier = Arc::new(Courier::new(
        sources,
        filter,
        enricher,
        transport.clone(),
        store.clone(),
        InterestsHandle::new(vec!["cricket".into()]),
        "5556168938".into(),
        "Pune".into(),
    ));
    (courier, transport, store)
}

// Scenario: 23 candidates make batches of (10, 10, 3); batch 2 is
// rate-limited twice and then selects its local positions 1 and 4, which
// must map back to global candidates 11 and 14.
#[tokio::test(start_paused = true)]
async fn batch_local_indices_map_to_global_candidates() {
    // Script order follows batch order, then one summary per delivered item.
    let mut script: Vec<std::result::Result<String, MockFailure>> = vec![
        Ok("1 and 2 look relevant".into()),      // batch 1
        Err(MockFailure::RateLimited),           // batch 2, attempt 1
        Err(MockFailure::RateLimited),           // batch 2, attempt 2
        Ok("1, 4".into()),                       // batch 2, attempt 3
        Ok("none of these".into()),              // batch 3
    ];
    script.extend((0..4).map(|_| Ok("a generated summary".into())));

    let (courier, transport, store) = build_courier(cands(23), script, false, 0);
    let report = courier.run_once().await;

    assert_eq!(report.collected, 23);
    assert_eq!(report.filtered, 4);
    assert_eq!(report.delivered, 4);
    assert_eq!(report.skipped, 0);

    let texts = transport.texts.lock().unwrap();
    let sent: Vec<&str> = texts.iter().map(|(_, t)| t.as_str()).collect();
    assert!(sent[0].contains("Link: https://example.com/1\n"));
    assert!(sent.iter().any(|t| t.contains("headline 11")));
    assert!(sent.iter().any(|t| t.contains("headline 14")));
    assert!(!sent.iter().any(|t| t.contains("headline 21")));

    let records = store.snapshot();
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].headline, "headline 11");
    assert_eq!(records[3].headline, "headline 14");
}

// Scenario: nothing collected, the run is a quiet no-op.
#[tokio::test]
async fn empty_collection_sends_and_records_nothing() {
    let (courier, transport, store) = build_courier(vec![], vec![], false, 0);
    let report = courier.run_once().await;

    assert_eq!(report.collected, 0);
    assert_eq!(report.delivered, 0);
    assert!(transport.texts.lock().unwrap().is_empty());
    assert!(store.snapshot().is_empty());
}

// Scenario: speech synthesis fails; the item still goes out as text and
// still gets its record.
#[tokio::test]
async fn synthesis_failure_degrades_to_text_only() {
    let script = vec![
        Ok("1".into()),            // filter batch
        Ok("short summary".into()), // summary
    ];
    let (courier, transport, store) = build_courier(cands(1), script, true, 0);
    let report = courier.run_once().await;

    assert_eq!(report.delivered, 1);
    assert_eq!(transport.texts.lock().unwrap().len(), 1);
    assert_eq!(*transport.audio_sends.lock().unwrap(), 0);
    assert_eq!(store.snapshot().len(), 1);
}

// A successful item sends its voice clip after the text.
#[tokio::test]
async fn audio_rides_along_when_synthesis_succeeds() {
    let script = vec![Ok("1".into()), Ok("short summary".into())];
    let (courier, transport, store) = build_courier(cands(1), script, false, 0);
    courier.run_once().await;

    assert_eq!(transport.texts.lock().unwrap().len(), 1);
    assert_eq!(*transport.audio_sends.lock().unwrap(), 1);
    assert_eq!(store.snapshot().len(), 1);
}

// A text-send failure skips that item (no record) but the loop continues.
#[tokio::test]
async fn text_send_failure_skips_item_but_run_continues() {
    let mut script: Vec<std::result::Result<String, MockFailure>> =
        vec![Ok("1 2 3".into())];
    script.extend((0..3).map(|_| Ok("summary".into())));

    let (courier, transport, store) = build_courier(cands(3), script, false, 1);
    let report = courier.run_once().await;

    assert_eq!(report.filtered, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 2);
    assert_eq!(transport.texts.lock().unwrap().len(), 2);

    let records = store.snapshot();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.headline != "headline 1"));
}
