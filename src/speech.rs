// src/speech.rs
//! Speech synthesis: turns a summary into a short voice clip. One attempt
//! per item; a failure here only downgrades the notification to text-only.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// Telegram voice messages carry a duration hint; the original clip length
/// is not known without decoding, so we use a fixed estimate.
pub const DEFAULT_DURATION_HINT_SECS: u32 = 30;

/// Synthesized audio, held only until the transport send finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub duration_hint_secs: u32,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
    fn name(&self) -> &'static str;
}

/// Google Cloud Text-to-Speech REST client. Requires `GOOGLE_TTS_API_KEY`.
pub struct GoogleTtsClient {
    http: reqwest::Client,
    api_key: String,
    language_code: String,
    voice_name: String,
}

impl GoogleTtsClient {
    pub fn new(api_key: String, language_code: String, voice_name: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-courier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            language_code,
            voice_name,
        }
    }

    pub fn from_env(language_code: String, voice_name: String) -> Self {
        let api_key = std::env::var("GOOGLE_TTS_API_KEY").unwrap_or_default();
        Self::new(api_key, language_code, voice_name)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        anyhow::ensure!(!self.api_key.is_empty(), "GOOGLE_TTS_API_KEY not set");

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            input: Input<'a>,
            voice: Voice<'a>,
            audio_config: AudioConfig<'a>,
        }
        #[derive(Serialize)]
        struct Input<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Voice<'a> {
            language_code: &'a str,
            name: &'a str,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct AudioConfig<'a> {
            audio_encoding: &'a str,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Resp {
            audio_content: String,
        }

        let req = Req {
            input: Input { text },
            voice: Voice {
                language_code: &self.language_code,
                name: &self.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "OGG_OPUS",
            },
        };

        let resp = self
            .http
            .post("https://texttospeech.googleapis.com/v1/text:synthesize")
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .context("tts request")?
            .error_for_status()
            .context("tts non-2xx")?;

        let body: Resp = resp.json().await.context("tts json")?;
        let bytes = BASE64
            .decode(body.audio_content.as_bytes())
            .context("tts audio base64")?;
        anyhow::ensure!(!bytes.is_empty(), "tts returned empty audio");

        Ok(AudioClip {
            bytes,
            duration_hint_secs: DEFAULT_DURATION_HINT_SECS,
        })
    }

    fn name(&self) -> &'static str {
        "google-tts"
    }
}
