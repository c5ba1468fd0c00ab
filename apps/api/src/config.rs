use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite://second_brain.db";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_DRIVE_FOLDER: &str = "Second Brain";
const DEFAULT_DRIVE_API_BASE_URL: &str = "https://www.googleapis.com";

/// Application configuration loaded from environment variables.
/// Built once at startup and handed to every client that needs credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Provider keys are optional: a missing key surfaces as a provider error
    /// on the request that needs it, not as a startup failure.
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub gemini_base_url: String,
    pub drive: DriveConfig,
    pub port: u16,
    pub rust_log: String,
}

/// Google Drive mirror settings.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub folder_name: String,
    /// Root of the Drive REST and upload endpoints.
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            gemini_api_key: secret("GEMINI_API_KEY"),
            anthropic_base_url: var("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL),
            gemini_base_url: var("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
            drive: DriveConfig {
                credentials_path: var("GOOGLE_CREDENTIALS_PATH", "credentials.json").into(),
                token_path: var("GOOGLE_TOKEN_PATH", "token.json").into(),
                folder_name: var("DRIVE_FOLDER_NAME", DEFAULT_DRIVE_FOLDER),
                api_base_url: var("DRIVE_API_BASE_URL", DEFAULT_DRIVE_API_BASE_URL),
            },
            port: var("PORT", "5001")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: var("RUST_LOG", "info"),
        })
    }
}
