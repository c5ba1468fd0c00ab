pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::drive::handlers as drive;
use crate::entries::handlers as entries;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Entries
        .route(
            "/api/v1/entries",
            get(entries::handle_list_entries).post(entries::handle_create_entry),
        )
        .route(
            "/api/v1/entries/:id",
            get(entries::handle_get_entry).delete(entries::handle_delete_entry),
        )
        .route(
            "/api/v1/entries/:id/summarize",
            post(assistant::handle_summarize),
        )
        .route("/api/v1/entries/:id/sync", post(drive::handle_sync_entry))
        // Assistant
        .route("/api/v1/chat", post(assistant::handle_chat))
        // Drive mirror
        .route("/api/v1/drive/status", get(drive::handle_drive_status))
        .route("/api/v1/drive/sync", post(drive::handle_sync_all))
        .with_state(state)
}
