//! Conversations domain: per-document chat threads, messages

pub mod domain;
pub mod store;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Conversation, Message, MessageContent, MessageRole, Reference};

pub use store::{ConversationStore, DocumentThreads};
