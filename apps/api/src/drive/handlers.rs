use axum::{
    extract::{Path, State},
    Json,
};

use crate::drive::{DriveStatus, SyncReport};
use crate::entries::store::get_entry;
use crate::errors::AppError;
use crate::models::entry::EntryRow;
use crate::state::AppState;

/// GET /api/v1/drive/status
pub async fn handle_drive_status(State(state): State<AppState>) -> Json<DriveStatus> {
    Json(state.drive.status())
}

/// POST /api/v1/drive/sync
///
/// Mirrors every entry. Fails only when Drive is unavailable as a whole;
/// per-entry failures are counted in the report.
pub async fn handle_sync_all(
    State(state): State<AppState>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state
        .drive
        .sync_all()
        .await
        .map_err(|e| AppError::Drive(format!("{e:#}")))?;
    Ok(Json(report))
}

/// POST /api/v1/entries/:id/sync
///
/// Best effort: returns the entry as stored afterwards, with `drive_file_id`
/// still null if the sync failed.
pub async fn handle_sync_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EntryRow>, AppError> {
    if get_entry(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Entry {id} not found")));
    }

    state.drive.sync_entry(id).await;

    let entry = get_entry(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Entry {id} not found")))?;
    Ok(Json(entry))
}
