//! Generation-service adapter: provider trait, error taxonomy, Gemini client.
//! Rate-limit failures are distinguished from everything else so the
//! relevance filter can retry only what is worth retrying.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Failure modes of a generation call. Only `RateLimited` is transient in a
/// way that retrying helps; everything else lands in `Failed`.
#[derive(Debug)]
pub enum GenerateError {
    RateLimited,
    Failed(anyhow::Error),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::RateLimited => write!(f, "generation service rate-limited (429)"),
            GenerateError::Failed(e) => write!(f, "generation failed: {e:#}"),
        }
    }
}

impl std::error::Error for GenerateError {}

impl GenerateError {
    pub fn failed(e: impl Into<anyhow::Error>) -> Self {
        GenerateError::Failed(e.into())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerateError::RateLimited)
    }
}

/// Trait object used by the relevance filter, enrichment, and the webhook
/// handler. One prompt in, free-form text out.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynGenerationClient = Arc<dyn GenerationClient>;

/// Factory: build a client from the environment.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock that selects
///   nothing (useful for local runs without a key).
/// * Else builds the Gemini provider; a missing `GEMINI_API_KEY` still
///   builds, and every call fails non-fatally at the call site.
pub fn build_client_from_env() -> DynGenerationClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockClient::always("".to_string()));
    }
    Arc::new(GeminiProvider::from_env(None))
}

// ------------------------------------------------------------
// Gemini provider
// ------------------------------------------------------------

/// Gemini provider (generateContent REST API). Requires `GEMINI_API_KEY`.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    /// `model_override`: pass Some("gemini-1.5-pro") to override; defaults
    /// to gemini-1.5-flash.
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("news-courier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        let model = model_override.unwrap_or("gemini-1.5-flash").to_string();
        Self {
            http,
            api_key,
            model,
        }
    }

    pub fn from_env(model_override: Option<&str>) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        Self::new(api_key, model_override)
    }
}

#[async_trait]
impl GenerationClient for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        if self.api_key.is_empty() {
            return Err(GenerateError::failed(anyhow::anyhow!(
                "GEMINI_API_KEY not set"
            )));
        }

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .map_err(GenerateError::failed)?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(GenerateError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::failed(anyhow::anyhow!(
                "gemini error {status}: {body}"
            )));
        }

        let body: Resp = resp.json().await.map_err(GenerateError::failed)?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GenerateError::failed(anyhow::anyhow!(
                "gemini response had no text candidates"
            )));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Mock client (tests and key-less local runs)
// ------------------------------------------------------------

/// Scriptable mock: pops one reply per call, or repeats a fixed reply
/// forever once the script runs dry.
pub struct MockClient {
    script: Mutex<Vec<Result<String, MockFailure>>>,
    fallthrough: Option<String>,
}

/// Cloneable stand-in for `GenerateError` so scripts can be built with
/// plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    RateLimited,
    Other,
}

impl MockClient {
    /// Every call returns `reply`.
    pub fn always(reply: String) -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            fallthrough: Some(reply),
        }
    }

    /// Replies are consumed front-to-back; once exhausted, calls fail.
    pub fn scripted(replies: Vec<Result<String, MockFailure>>) -> Self {
        Self {
            script: Mutex::new(replies),
            fallthrough: None,
        }
    }
}

#[async_trait]
impl GenerationClient for MockClient {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        let mut script = self.script.lock().expect("mock script mutex");
        if !script.is_empty() {
            return match script.remove(0) {
                Ok(s) => Ok(s),
                Err(MockFailure::RateLimited) => Err(GenerateError::RateLimited),
                Err(MockFailure::Other) => {
                    Err(GenerateError::failed(anyhow::anyhow!("scripted failure")))
                }
            };
        }
        match &self.fallthrough {
            Some(s) => Ok(s.clone()),
            None => Err(GenerateError::failed(anyhow::anyhow!(
                "mock script exhausted"
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_mock_pops_in_order_then_fails() {
        let mock = MockClient::scripted(vec![
            Ok("first".into()),
            Err(MockFailure::RateLimited),
            Ok("second".into()),
        ]);
        assert_eq!(mock.generate("p").await.unwrap(), "first");
        assert!(mock.generate("p").await.unwrap_err().is_rate_limited());
        assert_eq!(mock.generate("p").await.unwrap(), "second");
        assert!(mock.generate("p").await.is_err());
    }
}
