//! State machine errors
//!
//! Returned by the domain state machines when an event does not apply to the
//! current status. Statuses and events are carried in their display form.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StateError {
    #[error("Event {event} is not allowed in status {from}")]
    InvalidTransition { from: String, event: String },

    #[error("Status {0} is final")]
    TerminalState(String),
}

impl StateError {
    pub fn invalid(from: impl ToString, event: impl ToString) -> Self {
        StateError::InvalidTransition {
            from: from.to_string(),
            event: event.to_string(),
        }
    }

    /// Status the rejected event was applied to
    pub fn status(&self) -> &str {
        match self {
            StateError::InvalidTransition { from, .. } => from,
            StateError::TerminalState(status) => status,
        }
    }
}
