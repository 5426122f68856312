//! Document registry
//!
//! Owns every uploaded document in upload order. The collection lives behind
//! an `Arc` and is only changed through `Arc::make_mut`, so snapshots handed to
//! observers are never mutated in place; comparing snapshots with
//! `Arc::ptr_eq` tells whether anything changed.

use std::sync::Arc;

use kanun_common::{Error, Result};
use kanun_rag::IndexRequest;
use uuid::Uuid;

use crate::domain::entities::{Document, DocumentStatus, UploadFile};
use crate::domain::state::DocumentEvent;

#[derive(Debug, Clone, Default)]
pub struct DocumentRegistry {
    documents: Arc<Vec<Document>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an uploaded file as a new pending document
    pub fn register(&mut self, file: &UploadFile) -> Result<Document> {
        let document = Document::new(file)?;
        Arc::make_mut(&mut self.documents).push(document.clone());

        tracing::info!(document_id = %document.id, title = %document.title, "Document registered");
        Ok(document)
    }

    pub fn get(&self, id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Documents in upload order
    pub fn list(&self) -> &[Document] {
        &self.documents
    }

    /// Cheap, immutable view of the current documents
    pub fn snapshot(&self) -> Arc<Vec<Document>> {
        Arc::clone(&self.documents)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents currently in the given status
    pub fn with_status(&self, status: DocumentStatus) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(move |d| d.status == status)
    }

    /// Apply a state machine event to one document
    pub fn transition(&mut self, id: Uuid, event: DocumentEvent) -> Result<DocumentStatus> {
        let index = self.index_of(id)?;

        // Validate against the current value first so a rejected event never
        // forces a copy of the collection.
        let mut updated = self.documents[index].clone();
        let previous = updated.status;
        let next = updated.apply(event)?;
        Arc::make_mut(&mut self.documents)[index] = updated;

        tracing::info!(
            document_id = %id,
            from = %previous,
            to = %next,
            event = %event,
            "Document status changed"
        );
        Ok(next)
    }

    /// Move a pending document to processing and build its index request
    pub fn begin_indexing(&mut self, id: Uuid, collection_name: &str) -> Result<IndexRequest> {
        self.transition(id, DocumentEvent::Dispatch)?;
        let document = self.documents[self.index_of(id)?].clone();
        Ok(IndexRequest::for_document(&document.title, collection_name))
    }

    pub fn mark_completed(&mut self, id: Uuid) -> Result<DocumentStatus> {
        self.transition(id, DocumentEvent::IndexSucceeded)
    }

    pub fn mark_failed(&mut self, id: Uuid) -> Result<DocumentStatus> {
        self.transition(id, DocumentEvent::IndexFailed)
    }

    /// Put a failed document back to pending so it can be dispatched again
    pub fn retry(&mut self, id: Uuid) -> Result<DocumentStatus> {
        self.transition(id, DocumentEvent::Retry)
    }

    fn index_of(&self, id: Uuid) -> Result<usize> {
        self.documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(format!("Document {} not found", id)))
    }
}
