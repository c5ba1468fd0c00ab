use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::entries::store::{delete_entry, get_entry, insert_entry, list_entries};
use crate::errors::AppError;
use crate::models::entry::{EntryRow, NewEntry};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
}

/// GET /api/v1/entries?search=
pub async fn handle_list_entries(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<EntryRow>>, AppError> {
    let entries = list_entries(&state.db, params.search.as_deref(), None).await?;
    Ok(Json(entries))
}

/// POST /api/v1/entries
///
/// Stores the entry, then mirrors it to Drive on a best-effort basis.
pub async fn handle_create_entry(
    State(state): State<AppState>,
    Json(req): Json<NewEntry>,
) -> Result<(StatusCode, Json<EntryRow>), AppError> {
    let entry = insert_entry(&state.db, &req).await?;

    state.drive.sync_entry(entry.id).await;
    let entry = get_entry(&state.db, entry.id).await?.unwrap_or(entry);

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v1/entries/:id
pub async fn handle_get_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EntryRow>, AppError> {
    let entry = get_entry(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {id} not found")))?;
    Ok(Json(entry))
}

/// DELETE /api/v1/entries/:id
///
/// The Drive copy is trashed first because its file id lives on the row.
pub async fn handle_delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.drive.delete_entry(id).await;

    if !delete_entry(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Entry {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
