use sqlx::SqlitePool;

use crate::drive::DriveSync;
use crate::llm_client::Providers;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Both chat backends; handlers pick one per request with `ProviderKind`.
    pub providers: Providers,
    /// Best-effort Drive mirror. A disabled mirror turns every sync into a no-op.
    pub drive: DriveSync,
}
