//! Completions reported by spawned remote calls
//!
//! Spawned tasks never touch workspace state; they send one of these back to
//! the owner, which applies it.

use std::future::Future;

use kanun_rag::{FileQueryResponse, QueryResponse, RagError};
use uuid::Uuid;

#[derive(Debug)]
pub enum WorkspaceEvent {
    /// Index-build call for a document finished
    IndexCompleted {
        document_id: Uuid,
        result: Result<(), RagError>,
    },
    /// Query for a user message finished
    QueryCompleted {
        document_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        result: Result<QueryResponse, RagError>,
    },
}

#[derive(Debug)]
pub struct FileChatEvent {
    /// Selection generation the query was issued under
    pub generation: u64,
    pub result: Result<FileQueryResponse, RagError>,
}

/// Run a remote call on its own task and hand its outcome to `report`.
///
/// A call that panics is reported as a failed request, so every dispatch
/// produces exactly one completion.
pub(crate) fn spawn_reporting<T, F, R>(call: F, report: R)
where
    T: Send + 'static,
    F: Future<Output = Result<T, RagError>> + Send + 'static,
    R: FnOnce(Result<T, RagError>) + Send + 'static,
{
    tokio::spawn(async move {
        let result = tokio::spawn(call).await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Remote call task failed");
            Err(RagError::Request(format!("Task failed: {}", e)))
        });
        report(result);
    });
}
