//! # Error Types
//!
//! Structured error handling for the batch writer using thiserror.
//!
//! Errors fall into three groups:
//!
//! - **Store errors** ([`StoreError`]): raised by a backing store for a single
//!   operation or a whole atomic group
//! - **Group failures** ([`BatchError::GroupCommitFailed`]): an atomic group was
//!   rejected as a unit and every operation in it is considered failed
//! - **Invariant violations**: writes after close, groups over the cap and
//!   malformed operations. These are fatal and always returned to the caller.

use thiserror::Error;

use crate::models::DocumentRef;

/// Result type alias using the crate error type.
pub type Result<T> = std::result::Result<T, BatchError>;

/// Result type alias for backing store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by a backing document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Document not found: {target}")]
    NotFound { target: DocumentRef },

    #[error("Document already exists: {target}")]
    AlreadyExists { target: DocumentRef },

    #[error("Permission denied for {target}: {message}")]
    PermissionDenied { target: DocumentRef, message: String },

    #[error("Invalid argument for {target}: {message}")]
    InvalidArgument { target: DocumentRef, message: String },

    #[error("Batch of {size} operations exceeds store limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Contention while committing: {message}")]
    Contention { message: String },

    #[error("Bulk writer is closed")]
    WriterClosed,

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    /// The document the error refers to, when it concerns a single operation
    pub fn target(&self) -> Option<&DocumentRef> {
        match self {
            Self::NotFound { target }
            | Self::AlreadyExists { target }
            | Self::PermissionDenied { target, .. }
            | Self::InvalidArgument { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Main error type for the batch writer
#[derive(Error, Debug)]
pub enum BatchError {
    /// The store rejected an atomic group; none of its operations were applied
    #[error("Group {group_index} ({size} operations) failed to commit: {source}")]
    GroupCommitFailed {
        group_index: u64,
        size: usize,
        #[source]
        source: StoreError,
    },

    /// Flushing or closing the bulk writer failed
    #[error("Bulk writer {operation} failed: {source}")]
    BulkWriterFailed {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    /// A commit was abandoned before the store answered, e.g. by a timeout
    /// around `commit()`; its operations were counted as failed
    #[error("Commit of group {group_index} ({size} operations) was interrupted before the store answered")]
    CommitInterrupted { group_index: u64, size: usize },

    /// An operation was offered after `close()`
    #[error("Batch writer is closed; no further operations are accepted")]
    WriterClosed,

    /// A group would have grown past the configured cap
    #[error("Group overflow: cannot append to a group holding {size} operations (limit {limit})")]
    GroupOverflow { size: usize, limit: usize },

    /// An operation was built with an invalid kind/payload combination
    #[error("Invalid operation for {target}: {reason}")]
    InvalidOperation { target: DocumentRef, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Unknown migration: {tag}")]
    UnknownMigration { tag: String },

    #[error("Migration already registered: {tag}")]
    DuplicateMigration { tag: String },

    #[error("Production run of '{tag}' was not confirmed")]
    ConfirmationDeclined { tag: String },

    #[error("Migration '{tag}' failed: {source}")]
    Migration {
        tag: String,
        #[source]
        source: anyhow::Error,
    },
}

impl BatchError {
    /// Whether the writer can keep accepting operations after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::GroupCommitFailed { .. }
                | Self::BulkWriterFailed { .. }
                | Self::CommitInterrupted { .. }
        )
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn invalid_value(
        field: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_failure_message_includes_cause() {
        let error = BatchError::GroupCommitFailed {
            group_index: 3,
            size: 450,
            source: StoreError::Contention {
                message: "too much contention".to_string(),
            },
        };

        let message = error.to_string();
        assert!(message.contains("Group 3"));
        assert!(message.contains("450 operations"));
        assert!(message.contains("too much contention"));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_invariant_violations_are_fatal() {
        assert!(!BatchError::WriterClosed.is_recoverable());
        assert!(!BatchError::GroupOverflow { size: 3, limit: 3 }.is_recoverable());
        assert!(BatchError::CommitInterrupted {
            group_index: 0,
            size: 2
        }
        .is_recoverable());
    }

    #[test]
    fn test_store_error_target() {
        let target = DocumentRef::new("users/alice");
        let error = StoreError::NotFound {
            target: target.clone(),
        };
        assert_eq!(error.target(), Some(&target));
        assert_eq!(StoreError::WriterClosed.target(), None);
    }
}
