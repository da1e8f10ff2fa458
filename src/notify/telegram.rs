use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;

use super::Transport;
use crate::speech::AudioClip;

/// Telegram Bot API transport. Requires `TELEGRAM_BOT_TOKEN`; with no token
/// configured every send is a logged no-op so a key-less dev run still
/// exercises the rest of the pipeline.
pub struct TelegramTransport {
    token: Option<String>,
    client: Client,
}

impl TelegramTransport {
    pub fn from_env() -> Self {
        Self {
            token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            client: Client::new(),
        }
    }

    /// Optional builder for tests/tools
    pub fn new(token: String) -> Self {
        Self {
            token: Some(token),
            client: Client::new(),
        }
    }

    fn api_url(&self, token: &str, method: &str) -> String {
        format!("https://api.telegram.org/bot{token}/{method}")
    }
}

#[async_trait::async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let Some(token) = &self.token else {
            tracing::debug!("Telegram disabled (no TELEGRAM_BOT_TOKEN)");
            return Ok(());
        };

        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        self.client
            .post(self.api_url(token, "sendMessage"))
            .json(&body)
            .send()
            .await
            .context("telegram sendMessage")?
            .error_for_status()
            .context("telegram sendMessage non-2xx")?;
        Ok(())
    }

    async fn send_audio(&self, chat_id: &str, clip: &AudioClip) -> Result<()> {
        let Some(token) = &self.token else {
            tracing::debug!("Telegram disabled (no TELEGRAM_BOT_TOKEN)");
            return Ok(());
        };

        let voice = Part::bytes(clip.bytes.clone())
            .file_name("summary.ogg")
            .mime_str("audio/ogg")
            .context("voice part mime")?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("duration", clip.duration_hint_secs.to_string())
            .part("voice", voice);

        self.client
            .post(self.api_url(token, "sendVoice"))
            .multipart(form)
            .send()
            .await
            .context("telegram sendVoice")?
            .error_for_status()
            .context("telegram sendVoice non-2xx")?;
        Ok(())
    }
}
