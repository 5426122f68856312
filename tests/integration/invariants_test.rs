//! Workspace invariant tests
//!
//! Rules that must hold for every sequence of uploads and messages.

mod common;
mod invariants;
