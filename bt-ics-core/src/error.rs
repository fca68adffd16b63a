//! Error types for ICS export.

use thiserror::Error;

/// Errors that abort an export.
///
/// Only violated collaborator preconditions end up here. Degradable
/// problems (unknown timezones, missing optional fields) are recovered
/// where they occur and never surface as an error.
#[derive(Error, Debug)]
pub enum IcsError {
    #[error("Event {id} is marked recurring but has no schedule")]
    MissingSchedule { id: String },

    #[error("Event {id} is recurring but has no start time to anchor its rule")]
    MissingStart { id: String },

    #[error("Invalid recurrence rule for event {id}: {reason}")]
    InvalidRecurrence { id: String, reason: String },
}

/// Result type alias for ICS export operations.
pub type IcsResult<T> = Result<T, IcsError>;
