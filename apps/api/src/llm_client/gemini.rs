//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{api_error, prompts, ChatProvider, LlmError};

pub const MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    generate_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: Option<String>, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            generate_url: format!(
                "{}/v1beta/models/{MODEL}:generateContent",
                base_url.trim_end_matches('/')
            ),
        }
    }

    /// Sends one prompt and returns the generated text. One request, no retries.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingApiKey("GEMINI_API_KEY"))?;

        let request_body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.generate_url)
            .header("x-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let generated: GenerateResponse = response.json().await?;
        debug!("Gemini call succeeded: {} candidate(s)", generated.candidates.len());

        generated.text().ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn answer(&self, context: &str, question: &str) -> Result<String, LlmError> {
        self.generate(&prompts::answer_single_prompt(context, question))
            .await
    }

    async fn summarize(&self, text: &str) -> Result<String, LlmError> {
        self.generate(&prompts::summarize_prompt(text)).await
    }
}
