//! Domain layer for Documents: entities and the indexing state machine

pub mod entities;
pub mod state;
