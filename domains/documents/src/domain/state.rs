//! State machine for document indexing status
//!
//! Document states: Pending → Processing → Completed | Error, and
//! Error → Pending on an explicit user retry. Completed is terminal.

pub use kanun_common::StateError;

use crate::domain::entities::DocumentStatus;

impl DocumentStatus {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether an index-build request may be outstanding in this state
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Get all valid next states from current state
    pub fn valid_transitions(&self) -> &'static [DocumentStatus] {
        match self {
            Self::Pending => &[Self::Processing],
            Self::Processing => &[Self::Completed, Self::Error],
            Self::Completed => &[],
            Self::Error => &[Self::Pending],
        }
    }
}

/// Events that trigger document state transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DocumentEvent {
    /// Index-build request handed to the remote service
    Dispatch,
    /// Remote service accepted the index build
    IndexSucceeded,
    /// Index build failed (transport error or non-2xx)
    IndexFailed,
    /// User asked to try indexing again
    Retry,
}

impl std::fmt::Display for DocumentEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch => write!(f, "dispatch"),
            Self::IndexSucceeded => write!(f, "index_succeeded"),
            Self::IndexFailed => write!(f, "index_failed"),
            Self::Retry => write!(f, "retry"),
        }
    }
}

/// Document state machine
pub struct DocumentStateMachine;

impl DocumentStateMachine {
    /// Attempt a state transition
    ///
    /// Returns the new state if the transition is valid, or an error otherwise.
    pub fn transition(
        current: DocumentStatus,
        event: DocumentEvent,
    ) -> Result<DocumentStatus, StateError> {
        if current.is_terminal() {
            return Err(StateError::TerminalState(current.to_string()));
        }

        let next = match (&current, &event) {
            (DocumentStatus::Pending, DocumentEvent::Dispatch) => DocumentStatus::Processing,
            (DocumentStatus::Processing, DocumentEvent::IndexSucceeded) => {
                DocumentStatus::Completed
            }
            (DocumentStatus::Processing, DocumentEvent::IndexFailed) => DocumentStatus::Error,
            (DocumentStatus::Error, DocumentEvent::Retry) => DocumentStatus::Pending,
            _ => return Err(StateError::invalid(current, event)),
        };

        Ok(next)
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition(current: DocumentStatus, event: DocumentEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
