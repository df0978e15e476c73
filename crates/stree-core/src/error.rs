//! Domain-specific error types following panic-free policy.

use crate::SessionId;
use thiserror::Error;

/// Errors that can occur in session tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Session not found in the tree
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: SessionId },

    /// A node with this id is already tracked
    #[error("Session already exists: {session_id}")]
    SessionAlreadyExists { session_id: SessionId },

    /// The node names a parent the tree does not contain
    #[error("Parent {parent_id} of session {session_id} is not in the tree")]
    ParentNotFound {
        session_id: SessionId,
        parent_id: SessionId,
    },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
