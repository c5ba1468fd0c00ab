//! Question answering and summarization over stored entries.
//!
//! Provider failures are contained here: they become inline reply text and
//! never fail the request. Store failures still propagate as `AppError`.

pub mod context_selector;
pub mod handlers;

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::warn;

use crate::entries::store::get_entry;
use crate::errors::AppError;
use crate::llm_client::{LlmError, ProviderKind, Providers};
use crate::models::entry::EntryRow;
use context_selector::select_context;

/// What the caller shows the user: either the provider's text or an
/// `Error from {provider}: {message}` line.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReply {
    pub provider: ProviderKind,
    pub text: String,
    pub is_error: bool,
}

impl ProviderReply {
    /// Converts a provider result into a reply, turning errors into text.
    pub fn contain(provider: ProviderKind, result: Result<String, LlmError>) -> Self {
        match result {
            Ok(text) => Self {
                provider,
                text,
                is_error: false,
            },
            Err(e) => {
                warn!("Provider {provider} failed: {e}");
                Self {
                    provider,
                    text: format!("Error from {provider}: {e}"),
                    is_error: true,
                }
            }
        }
    }
}

/// Answers `question` from the stored entries selected for it.
pub async fn ask(
    pool: &SqlitePool,
    providers: &Providers,
    provider: ProviderKind,
    question: &str,
) -> Result<ProviderReply, AppError> {
    let context = select_context(pool, question).await?;
    let result = providers.get(provider).answer(&context, question).await;
    Ok(ProviderReply::contain(provider, result))
}

/// Summarizes one entry. `NotFound` when the entry does not exist.
pub async fn summarize_entry(
    pool: &SqlitePool,
    providers: &Providers,
    provider: ProviderKind,
    entry_id: i64,
) -> Result<ProviderReply, AppError> {
    let entry = get_entry(pool, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {entry_id} not found")))?;

    let result = providers.get(provider).summarize(&summary_source(&entry)).await;
    Ok(ProviderReply::contain(provider, result))
}

/// `Title\n\nContent`, plus `\n\nURL: <url>` when present.
fn summary_source(entry: &EntryRow) -> String {
    let mut text = format!("{}\n\n{}", entry.title, entry.content);
    if !entry.url.is_empty() {
        text.push_str("\n\nURL: ");
        text.push_str(&entry.url);
    }
    text
}
