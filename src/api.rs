use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::{normalize_terms, InterestsHandle};
use crate::enrich::EnrichmentPipeline;
use crate::notify::Transport;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub interests: InterestsHandle,
    pub store: Arc<dyn RecordStore>,
    pub enricher: Arc<EnrichmentPipeline>,
    pub transport: Arc<dyn Transport>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/telegram", post(telegram_webhook))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// Telegram update envelope, reduced to the fields the commands need.
#[derive(Debug, serde::Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, serde::Deserialize)]
struct IncomingMessage {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct Chat {
    id: i64,
}

/// Inbound command handler. Always answers 200 to Telegram — a failed
/// reply is our problem, not the webhook caller's — and unrecognized text
/// is silently ignored.
async fn telegram_webhook(
    State(state): State<AppState>,
    Json(update): Json<TelegramUpdate>,
) -> StatusCode {
    let Some(message) = update.message else {
        return StatusCode::OK;
    };
    let Some(raw) = message.text else {
        return StatusCode::OK;
    };
    let chat_id = message.chat.id.to_string();
    let text = raw.to_lowercase();

    if let Some(rest) = strip_command(&text, "my interests") {
        let terms = normalize_terms(rest.split(',').map(str::to_string).collect());
        info!(count = terms.len(), "interest set replaced via webhook");
        state.interests.replace(terms.clone());
        reply(&state, &chat_id, &format!("Updated interests to {terms:?}")).await;
    } else if let Some(headline) = strip_command(&text, "more about") {
        let summary = state.enricher.summarize(&headline, "general").await;
        reply(&state, &chat_id, &summary).await;
    } else if text.contains("read full article") {
        let answer = match state.store.latest() {
            Ok(Some(record)) => format!("Full article: {}", record.url),
            Ok(None) => "No articles found.".to_string(),
            Err(e) => {
                warn!(error = ?e, "latest-record lookup failed");
                "No articles found.".to_string()
            }
        };
        reply(&state, &chat_id, &answer).await;
    }

    StatusCode::OK
}

/// Command match mirrors the bot's chat grammar: substring, with everything
/// after the phrase treated as the argument.
fn strip_command(text: &str, command: &str) -> Option<String> {
    let pos = text.find(command)?;
    Some(text[pos + command.len()..].trim().to_string())
}

async fn reply(state: &AppState, chat_id: &str, text: &str) {
    if let Err(e) = state.transport.send_text(chat_id, text).await {
        warn!(error = ?e, "webhook reply failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_command_takes_trailing_argument() {
        assert_eq!(
            strip_command("more about india wins the cup", "more about"),
            Some("india wins the cup".to_string())
        );
        assert_eq!(
            strip_command("my interests cricket, tech", "my interests"),
            Some("cricket, tech".to_string())
        );
        assert_eq!(strip_command("hello there", "more about"), None);
    }
}
