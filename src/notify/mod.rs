pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::enrich::EnrichedNotification;
use crate::speech::AudioClip;

/// Chat transport consumed by the delivery loop and the webhook handler.
/// Implementations report per-call success/failure; retry policy, if any,
/// belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()>;
    async fn send_audio(&self, chat_id: &str, clip: &AudioClip) -> Result<()>;
}

/// Text body of a delivered notification.
pub fn notification_text(n: &EnrichedNotification) -> String {
    format!(
        "News ({}, {}): {}\nLink: {}\nReply 'More about {}' or 'Read full article'",
        n.category, n.sentiment, n.headline, n.link, n.headline
    )
}
