//! Domain entities for Documents domain
//!
//! A document is registered the moment it is uploaded and tracks the
//! indexing status reported by the remote RAG service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use kanun_common::{Error, Result};

use crate::domain::state::{DocumentEvent, DocumentStateMachine, StateError};

/// Document indexing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Pending => write!(f, "pending"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Completed => write!(f, "completed"),
            DocumentStatus::Error => write!(f, "error"),
        }
    }
}

/// Maximum title length accepted for an uploaded file
const MAX_TITLE_LENGTH: usize = 255;

/// A file handed to the upload pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    pub name: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Use the final path component as the file name
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .map(Self::new)
    }
}

impl From<&str> for UploadFile {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Document entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    /// Index-build requests issued for this document so far
    pub attempts: u32,
}

impl Document {
    /// Create a new pending document from an uploaded file
    pub fn new(file: &UploadFile) -> Result<Self> {
        let title = &file.name;
        if title.trim().is_empty() {
            return Err(Error::Validation("File name is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::Validation(format!(
                "File name must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        Ok(Document {
            id: Uuid::new_v4(),
            title: title.clone(),
            status: DocumentStatus::default(),
            uploaded_at: Utc::now(),
            attempts: 0,
        })
    }

    /// Apply a state machine event, updating status (and attempt count on dispatch)
    pub fn apply(&mut self, event: DocumentEvent) -> std::result::Result<DocumentStatus, StateError> {
        let next = DocumentStateMachine::transition(self.status, event)?;
        if event == DocumentEvent::Dispatch {
            self.attempts += 1;
        }
        self.status = next;
        Ok(next)
    }

    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Completed
    }
}
