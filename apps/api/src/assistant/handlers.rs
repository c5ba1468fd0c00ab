use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::assistant::{ask, summarize_entry, ProviderReply};
use crate::errors::AppError;
use crate::llm_client::ProviderKind;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub question: String,
    pub provider: ProviderKind,
    pub answer: String,
    pub is_error: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub entry_id: i64,
    #[serde(flatten)]
    pub reply: ProviderReply,
}

/// POST /api/v1/chat
///
/// Provider errors come back as a 200 with `is_error: true` and the error
/// text in `answer`.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let provider = ProviderKind::from_key(req.provider.as_deref());
    let reply = ask(&state.db, &state.providers, provider, &req.question).await?;

    Ok(Json(ChatResponse {
        question: req.question,
        provider: reply.provider,
        answer: reply.text,
        is_error: reply.is_error,
    }))
}

/// POST /api/v1/entries/:id/summarize
pub async fn handle_summarize(
    State(state): State<AppState>,
    Path(entry_id): Path<i64>,
    body: Option<Json<SummarizeRequest>>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let provider = ProviderKind::from_key(req.provider.as_deref());
    let reply = summarize_entry(&state.db, &state.providers, provider, entry_id).await?;

    Ok(Json(SummarizeResponse { entry_id, reply }))
}
