mod assistant;
mod config;
mod db;
mod drive;
mod entries;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::drive::client::DriveClient;
use crate::drive::{DocumentStore, DriveStatus, DriveSync};
use crate::llm_client::{claude, gemini, Providers};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Second Brain API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite
    let db = create_pool(&config.database_url).await?;

    // One HTTP client shared by every outbound integration
    let http = reqwest::Client::new();

    // Initialize LLM providers
    let providers = Providers::from_config(&config, http.clone());
    info!(
        "LLM providers initialized (claude: {}, gemini: {})",
        claude::MODEL,
        gemini::MODEL
    );
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; Claude requests will return an error");
    }
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; Gemini requests will return an error");
    }

    // Initialize Drive mirror (disabled unless credentials and a token are present)
    let drive = build_drive_sync(&config, db.clone(), http);

    let state = AppState {
        db,
        providers,
        drive,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the Drive mirror. A broken token file disables the mirror rather
/// than stopping the server.
fn build_drive_sync(config: &Config, db: sqlx::SqlitePool, http: reqwest::Client) -> DriveSync {
    let status = DriveStatus::detect(&config.drive);
    let store: Option<Arc<dyn DocumentStore>> = match DriveClient::load(&config.drive, http) {
        Ok(Some(client)) => {
            info!("Drive sync enabled (folder: '{}')", config.drive.folder_name);
            Some(Arc::new(client))
        }
        Ok(None) => {
            info!("Drive sync disabled: credentials or token file missing");
            None
        }
        Err(e) => {
            warn!("Drive sync disabled: could not load token file: {e}");
            None
        }
    };
    DriveSync::new(db, store, config.drive.folder_name.clone(), status)
}
