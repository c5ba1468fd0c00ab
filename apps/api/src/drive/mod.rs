//! Drive Sync — one-way mirror of entries into a cloud document store.
//!
//! Per-entry `sync_entry` / `delete_entry` are best effort: they do nothing
//! when the mirror is disabled, and log and swallow every failure. Only the
//! bulk `sync_all` reports errors to its caller.
//!
//! `AppState` holds a `DriveSync` wrapping an `Arc<dyn DocumentStore>`
//! (`DriveClient` in production, an in-memory fake in tests).

pub mod client;
pub mod handlers;
pub mod render;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::DriveConfig;
use crate::entries::store::{get_entry, list_entries, set_drive_file_id};
use crate::models::entry::EntryRow;
use client::{token_file_is_authenticated, DriveError};
use render::render_entry_html;

/// A document as pushed to the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub name: String,
    pub html: String,
}

impl RemoteDocument {
    pub fn from_entry(entry: &EntryRow) -> Self {
        Self {
            name: entry.display_name(),
            html: render_entry_html(entry),
        }
    }
}

/// The remote side of the mirror. Implement this to target another store
/// without touching the sync logic.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Id of the folder named `name`, created when absent.
    async fn ensure_folder(&self, name: &str) -> Result<String, DriveError>;

    /// Creates a document inside `folder_id` and returns its file id.
    async fn create_document(
        &self,
        folder_id: &str,
        document: &RemoteDocument,
    ) -> Result<String, DriveError>;

    /// Rewrites the name and body of an existing document.
    async fn update_document(&self, file_id: &str, document: &RemoteDocument)
        -> Result<(), DriveError>;

    /// Moves a document to the trash. Not a permanent delete.
    async fn trash_document(&self, file_id: &str) -> Result<(), DriveError>;
}

/// `configured` and `authenticated` are checked independently: a token file
/// without a credentials file still reports authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveStatus {
    pub configured: bool,
    pub authenticated: bool,
}

impl DriveStatus {
    /// Credentials file present; token file present and holding a token.
    pub fn detect(config: &DriveConfig) -> Self {
        Self {
            configured: config.credentials_path.exists(),
            authenticated: token_file_is_authenticated(&config.token_path),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct DriveSync {
    db: SqlitePool,
    store: Option<Arc<dyn DocumentStore>>,
    folder_name: String,
    status: DriveStatus,
}

impl DriveSync {
    /// `store` is `None` when Drive is unconfigured or unauthenticated;
    /// every operation then becomes a no-op. `status` is reported as given.
    pub fn new(
        db: SqlitePool,
        store: Option<Arc<dyn DocumentStore>>,
        folder_name: impl Into<String>,
        status: DriveStatus,
    ) -> Self {
        Self {
            db,
            store,
            folder_name: folder_name.into(),
            status,
        }
    }

    #[cfg(test)]
    pub fn disabled(db: SqlitePool) -> Self {
        Self::new(db, None, String::new(), DriveStatus::default())
    }

    pub fn status(&self) -> DriveStatus {
        self.status
    }

    /// Pushes one entry: creates the remote document on first sync and
    /// records its id, updates it afterwards.
    pub async fn sync_entry(&self, entry_id: i64) {
        let Some(store) = &self.store else { return };
        if let Err(e) = self.try_sync_entry(store.as_ref(), entry_id).await {
            warn!("Drive sync error for entry {entry_id}: {e:#}");
        }
    }

    /// Trashes the remote copy of an entry, if it has one. Call before the
    /// row is deleted, since the file id lives on the row.
    pub async fn delete_entry(&self, entry_id: i64) {
        let Some(store) = &self.store else { return };
        if let Err(e) = self.try_delete_entry(store.as_ref(), entry_id).await {
            warn!("Drive delete error for entry {entry_id}: {e:#}");
        }
    }

    /// Pushes every entry. Per-entry failures are counted, not returned.
    pub async fn sync_all(&self) -> anyhow::Result<SyncReport> {
        let store = self
            .store
            .as_ref()
            .context("Google Drive is not configured or not authenticated")?;
        let folder_id = store
            .ensure_folder(&self.folder_name)
            .await
            .context("could not resolve the Drive folder")?;

        let mut report = SyncReport::default();
        for entry in list_entries(&self.db, None, None).await? {
            match self.push(store.as_ref(), &folder_id, &entry).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    warn!("Drive sync error for entry {}: {e:#}", entry.id);
                    report.errors += 1;
                }
            }
        }

        info!(
            "Drive sync finished: {} synced, {} errors",
            report.synced, report.errors
        );
        Ok(report)
    }

    async fn try_sync_entry(&self, store: &dyn DocumentStore, entry_id: i64) -> anyhow::Result<()> {
        let Some(entry) = get_entry(&self.db, entry_id).await? else {
            return Ok(());
        };
        let folder_id = store.ensure_folder(&self.folder_name).await?;
        self.push(store, &folder_id, &entry).await
    }

    async fn try_delete_entry(&self, store: &dyn DocumentStore, entry_id: i64) -> anyhow::Result<()> {
        let Some(file_id) = get_entry(&self.db, entry_id)
            .await?
            .and_then(|e| e.drive_file_id)
        else {
            return Ok(());
        };
        store.trash_document(&file_id).await?;
        info!("Trashed Drive file {file_id} for entry {entry_id}");
        Ok(())
    }

    async fn push(
        &self,
        store: &dyn DocumentStore,
        folder_id: &str,
        entry: &EntryRow,
    ) -> anyhow::Result<()> {
        let document = RemoteDocument::from_entry(entry);
        match &entry.drive_file_id {
            Some(file_id) => store.update_document(file_id, &document).await?,
            None => {
                let file_id = store.create_document(folder_id, &document).await?;
                set_drive_file_id(&self.db, entry.id, &file_id).await?;
                info!("Entry {} mirrored to Drive file {file_id}", entry.id);
            }
        }
        Ok(())
    }
}
