//! Documents domain: uploaded documents, indexing status, registry

pub mod domain;
pub mod registry;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Document, DocumentStatus, UploadFile};
pub use domain::state::{DocumentEvent, DocumentStateMachine, StateError};

pub use registry::DocumentRegistry;
