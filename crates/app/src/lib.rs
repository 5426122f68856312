//! Kanun client application
//!
//! Ties the documents and conversations domains to the RAG service:
//! - `Workspace`: uploads, indexing status, per-document conversations
//! - `FileChatSession`: chat against a single pre-indexed file
//! - `WorkspaceEvent`: completions reported by spawned remote calls

pub mod events;
pub mod file_chat;
pub mod workspace;

pub use events::{FileChatEvent, WorkspaceEvent};
pub use file_chat::{FileChatMessage, FileChatSession};
pub use workspace::{Workspace, WorkspaceSnapshot, QUERY_ERROR_REPLY};
