//! Context Selector — picks which stored entries a question is answered from.
//!
//! No LLM calls. Reads the Entry Store and renders a plain-text block.

use sqlx::SqlitePool;

use crate::entries::store::list_entries;
use crate::errors::AppError;
use crate::models::entry::EntryRow;

/// Maximum number of entries rendered into a context block.
pub const CONTEXT_ENTRY_LIMIT: usize = 10;

/// Builds the context block for `question`.
///
/// Algorithm:
/// 1. Entries whose title or content contains the question (case-insensitive)
/// 2. If none match, every entry
/// 3. Most recent first, at most `CONTEXT_ENTRY_LIMIT`
/// 4. Rendered with `render_context`
pub async fn select_context(pool: &SqlitePool, question: &str) -> Result<String, AppError> {
    let mut entries = list_entries(pool, Some(question), Some(CONTEXT_ENTRY_LIMIT)).await?;
    if entries.is_empty() {
        entries = list_entries(pool, None, Some(CONTEXT_ENTRY_LIMIT)).await?;
    }
    Ok(render_context(&entries))
}

/// Joins rendered entries with a blank line.
pub fn render_context(entries: &[EntryRow]) -> String {
    entries
        .iter()
        .take(CONTEXT_ENTRY_LIMIT)
        .map(render_entry)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `[TYPE] Title\nContent`, plus `\nURL: <url>` when the entry has one.
pub fn render_entry(entry: &EntryRow) -> String {
    let mut block = format!("{}\n{}", entry.display_name(), entry.content);
    if !entry.url.is_empty() {
        block.push_str("\nURL: ");
        block.push_str(&entry.url);
    }
    block
}
