//! News Courier — Binary Entrypoint
//! Boots the Axum webhook server, wires the delivery pipeline, and spawns
//! the notification scheduler.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use news_courier::ai_adapter;
use news_courier::api::{self, AppState};
use news_courier::config::{CourierConfig, InterestsHandle};
use news_courier::delivery::Courier;
use news_courier::enrich::{EnrichmentPipeline, SummaryLength};
use news_courier::ingest::providers::{newsapi::NewsApiProvider, webpage::WebPageProvider};
use news_courier::ingest::types::HeadlineSource;
use news_courier::metrics::Metrics;
use news_courier::notify::telegram::TelegramTransport;
use news_courier::relevance::{FilterConfig, RelevanceFilter};
use news_courier::scheduler::spawn_notification_scheduler;
use news_courier::speech::GoogleTtsClient;
use news_courier::store::JsonlStore;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - COURIER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("COURIER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_courier=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // NEWSAPI_KEY / GEMINI_API_KEY / GOOGLE_TTS_API_KEY / TELEGRAM_BOT_TOKEN
    // and COURIER_CONFIG_PATH from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = CourierConfig::load();
    let interests = InterestsHandle::new(cfg.interests.clone());

    // --- Collaborators ---
    let generation = ai_adapter::build_client_from_env();
    let speech = Arc::new(GoogleTtsClient::from_env(
        cfg.language.clone(),
        cfg.voice_name.clone(),
    ));
    let transport = Arc::new(TelegramTransport::from_env());
    let store = Arc::new(JsonlStore::new(cfg.record_path.clone()));

    let sources: Vec<Box<dyn HeadlineSource>> = vec![
        Box::new(NewsApiProvider::from_env(
            cfg.search_sources.clone(),
            cfg.language.clone(),
        )),
        Box::new(WebPageProvider::new(
            cfg.source_urls.clone(),
            cfg.heading_selector.clone(),
        )),
    ];

    let filter = RelevanceFilter::new(
        generation.clone(),
        FilterConfig {
            batch_size: cfg.batch_size,
            fallback_count: cfg.fallback_count,
            max_attempts: cfg.max_attempts,
            backoff_base_secs: cfg.backoff_base_secs,
        },
    );
    let enricher = Arc::new(EnrichmentPipeline::new(
        generation.clone(),
        speech,
        cfg.location.clone(),
        SummaryLength {
            min_words: cfg.summary_min_words,
            max_words: cfg.summary_max_words,
        },
    ));

    let courier = Arc::new(Courier::new(
        sources,
        filter,
        enricher.clone(),
        transport.clone(),
        store.clone(),
        interests.clone(),
        cfg.chat_id.clone(),
        cfg.location.clone(),
    ));

    // --- Background trigger task ---
    let _scheduler = spawn_notification_scheduler(courier, cfg.parsed_notification_times());

    // --- Metrics + webhook router ---
    let metrics = Metrics::init();
    let state = AppState {
        interests,
        store,
        enricher,
        transport,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
