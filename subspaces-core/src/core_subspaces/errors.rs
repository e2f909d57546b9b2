//! Error types for the subspaces subsystem
//!
//! Every operation returns its error synchronously; nothing is retried
//! internally. `PermissionDenied` is the only variant expected during normal
//! operation and carries enough context to build a user-facing message.

use super::permission::PermissionSet;
use super::types::{Address, SectionId, SubspaceId};
use thiserror::Error;

/// Errors that can occur in the subspaces subsystem
#[derive(Debug, Error)]
pub enum SubspacesError {
    /// Malformed entity: blank name, zero ID, malformed address, unregistered permission
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced subspace, section, group, ACL or membership entry is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempted creation of an already existing keyed entity
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// The acting user lacks a required permission
    #[error(
        "Permission denied: {user} lacks {required} in subspace {subspace_id} section {section_id}"
    )]
    PermissionDenied {
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: Address,
        required: PermissionSet,
    },

    /// Inconsistent state: genesis inconsistency, section cycle
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for subspaces operations
pub type SubspacesResult<T> = Result<T, SubspacesError>;

impl SubspacesError {
    /// Short machine-friendly name of the error class, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            SubspacesError::Validation(_) => "validation",
            SubspacesError::NotFound(_) => "not_found",
            SubspacesError::Duplicate(_) => "duplicate",
            SubspacesError::PermissionDenied { .. } => "permission_denied",
            SubspacesError::InvalidState(_) => "invalid_state",
            SubspacesError::Storage(_) => "storage",
            SubspacesError::Serialization(_) => "serialization",
        }
    }
}

impl From<rusqlite::Error> for SubspacesError {
    fn from(err: rusqlite::Error) -> Self {
        SubspacesError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for SubspacesError {
    fn from(err: r2d2::Error) -> Self {
        SubspacesError::Storage(format!("connection pool: {}", err))
    }
}

impl From<bincode::Error> for SubspacesError {
    fn from(err: bincode::Error) -> Self {
        SubspacesError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SubspacesError {
    fn from(err: serde_json::Error) -> Self {
        SubspacesError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SubspacesError {
    fn from(err: std::io::Error) -> Self {
        SubspacesError::Storage(err.to_string())
    }
}
