//! Entry Store — the only module that reads or writes the `entries` table.

use sqlx::SqlitePool;
use tracing::info;

use crate::errors::AppError;
use crate::models::entry::{EntryRow, NewEntry};

/// Column list shared by every SELECT. `url` may be NULL in databases
/// created by older releases, so it is coalesced to the empty string.
const ENTRY_COLUMNS: &str =
    "id, type, title, content, COALESCE(url, '') AS url, created_at, drive_file_id";

/// Validates and inserts a new entry, returning the stored row.
pub async fn insert_entry(pool: &SqlitePool, entry: &NewEntry) -> Result<EntryRow, AppError> {
    entry.validate()?;

    let id = sqlx::query("INSERT INTO entries (type, title, content, url) VALUES (?, ?, ?, ?)")
        .bind(entry.entry_type.as_str())
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.url)
        .execute(pool)
        .await?
        .last_insert_rowid();

    info!("Inserted {} entry {id}", entry.entry_type);

    get_entry(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {id} not found")))
}

pub async fn get_entry(pool: &SqlitePool, id: i64) -> Result<Option<EntryRow>, AppError> {
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?");
    Ok(sqlx::query_as::<_, EntryRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Returns entries most-recent first, optionally filtered by a
/// case-insensitive substring of title or content, capped at `limit` rows.
///
/// Only an empty `search` means no filter; `" "` matches entries containing
/// a space. Case folding is Unicode-aware (`"été"` matches `"Été"`), so the
/// filter runs over the ordered rows rather than as a SQL `LIKE`.
pub async fn list_entries(
    pool: &SqlitePool,
    search: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<EntryRow>, AppError> {
    let Some(term) = search.filter(|s| !s.is_empty()) else {
        // SQLite treats a negative LIMIT as "no limit".
        let sql_limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        return Ok(sqlx::query_as::<_, EntryRow>(&sql)
            .bind(sql_limit)
            .fetch_all(pool)
            .await?);
    };

    let needle = term.to_lowercase();
    let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, EntryRow>(&sql)
        .fetch_all(pool)
        .await?
        .into_iter()
        .filter(|row| matches_search(row, &needle))
        .take(limit.unwrap_or(usize::MAX))
        .collect();

    Ok(rows)
}

fn matches_search(row: &EntryRow, needle: &str) -> bool {
    row.title.to_lowercase().contains(needle) || row.content.to_lowercase().contains(needle)
}

/// Deletes an entry. Returns `false` when no row had that id.
pub async fn delete_entry(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() > 0 {
        info!("Deleted entry {id}");
    }
    Ok(result.rows_affected() > 0)
}

/// Records the Drive file id after the first successful sync.
pub async fn set_drive_file_id(pool: &SqlitePool, id: i64, file_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE entries SET drive_file_id = ? WHERE id = ?")
        .bind(file_id)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
