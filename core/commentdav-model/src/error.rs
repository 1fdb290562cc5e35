//! Error kinds a comment store may report.
//!
//! Callers match on the variant rather than inspecting messages; the DAV
//! layer maps each kind to a protocol status.

use thiserror::Error;

/// Result type for comment operations.
pub type CommentResult<T> = Result<T, CommentError>;

/// Errors that can occur in comment model and store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentError {
    /// No comment with the given id exists.
    #[error("comment not found: {0}")]
    NotFound(String),

    /// Message exceeds [`crate::MAX_MESSAGE_LENGTH`].
    #[error("Comment message must not exceed {max} characters")]
    MessageTooLong { max: usize },

    /// Missing or malformed input (empty actor, object or verb, bad id).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The comment changed underneath the caller.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),
}
