/// LLM Client — the single point of entry for all chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// Handlers pick a backend with `ProviderKind` and talk to it through `ChatProvider`.
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

pub mod claude;
pub mod gemini;
pub mod prompts;

use claude::ClaudeClient;
use gemini::GeminiClient;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Capability set shared by every backend. Errors propagate to the caller,
/// which decides how to present them.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Answers `question` using only the stored-content `context` block.
    async fn answer(&self, context: &str, question: &str) -> Result<String, LlmError>;

    /// Returns a concise summary of `text`.
    async fn summarize(&self, text: &str) -> Result<String, LlmError>;
}

/// Which backend serves a request. Claude is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Claude,
    Gemini,
}

impl ProviderKind {
    /// Resolves a caller-supplied key. Keys match exactly; missing or
    /// unrecognized keys (including `"Gemini"`) fall back to the default
    /// backend instead of failing the request.
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("gemini") => ProviderKind::Gemini,
            Some("claude") => ProviderKind::Claude,
            _ => ProviderKind::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body shape shared by the Anthropic and Gemini APIs:
/// `{ "error": { "message": "..." } }`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Builds an `LlmError::Api` from a non-success response, preferring the
/// provider's own error message over the raw body.
async fn api_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    LlmError::Api { status, message }
}

/// Both backends, constructed once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Providers {
    claude: Arc<dyn ChatProvider>,
    gemini: Arc<dyn ChatProvider>,
}

impl Providers {
    pub fn new(claude: Arc<dyn ChatProvider>, gemini: Arc<dyn ChatProvider>) -> Self {
        Self { claude, gemini }
    }

    pub fn from_config(config: &Config, http: Client) -> Self {
        Self::new(
            Arc::new(ClaudeClient::new(
                http.clone(),
                config.anthropic_api_key.clone(),
                &config.anthropic_base_url,
            )),
            Arc::new(GeminiClient::new(
                http,
                config.gemini_api_key.clone(),
                &config.gemini_base_url,
            )),
        )
    }

    pub fn get(&self, kind: ProviderKind) -> &dyn ChatProvider {
        match kind {
            ProviderKind::Claude => self.claude.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }
}
