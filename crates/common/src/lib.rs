//! Shared utilities, configuration, and error handling for Kanun
//!
//! This crate provides common functionality used across the Kanun client:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - State machine errors shared by the domain crates

pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::StateError;
