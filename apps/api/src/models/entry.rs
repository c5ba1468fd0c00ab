use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Note,
    Link,
    Document,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Note => "note",
            EntryType::Link => "link",
            EntryType::Document => "document",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted knowledge-base entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntryRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub created_at: NaiveDateTime,
    /// Google Drive file id; `None` until the first successful sync.
    pub drive_file_id: Option<String>,
}

impl EntryRow {
    /// Upper-cased type used in rendered labels, e.g. `NOTE`.
    pub fn type_label(&self) -> String {
        self.entry_type.to_uppercase()
    }

    /// `[TYPE] Title`, the name used for context blocks and remote documents.
    pub fn display_name(&self) -> String {
        format!("[{}] {}", self.type_label(), self.title)
    }
}

/// Input for creating an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

impl NewEntry {
    pub fn new(entry_type: EntryType, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            entry_type,
            title: title.into(),
            content: content.into(),
            url: String::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Rejects entries that must never reach storage.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required.".to_string()));
        }
        Ok(())
    }
}
