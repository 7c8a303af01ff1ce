//! Error types for changelog execution.

use std::path::PathBuf;

use keel_core::{KeelError, ValidationErrors};

/// Errors that can occur while loading or running a changelog.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// SQL generation or diffing failed.
    #[error(transparent)]
    Core(#[from] KeelError),

    /// Database error during execution.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing changelog files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to parse a changelog file.
    #[error("Failed to parse changelog '{path}': {message}")]
    ParseError {
        /// Path to the changelog file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Two change sets share the same identity.
    #[error("Duplicate change set {filename}::{id}::{author}")]
    DuplicateChangeSet {
        /// Change set id.
        id: String,
        /// Change set author.
        author: String,
        /// Changelog file name.
        filename: String,
    },

    /// A ran change set was edited after it was applied.
    #[error("Checksum mismatch for change set '{change_set}': was {expected}, is now {actual}")]
    ChecksumMismatch {
        /// Change set identity.
        change_set: String,
        /// Checksum recorded in the history table.
        expected: String,
        /// Checksum of the change set as written now.
        actual: String,
    },

    /// A change set failed validation on the target database.
    #[error("Change set '{change_set}' is invalid: {errors}")]
    Validation {
        /// Change set identity.
        change_set: String,
        /// Every problem found.
        errors: ValidationErrors,
    },

    /// A change set has no explicit rollback and cannot be reversed.
    #[error("Change set '{0}' is not reversible")]
    NotReversible(String),

    /// A history row names a change set the changelog doesn't contain.
    #[error("Change set '{0}' ran but is not in the changelog")]
    UnknownChangeSet(String),

    /// The changelog lock is held by someone else.
    #[error("Could not acquire change log lock, currently held by {}", .locked_by.as_deref().unwrap_or("an unknown owner"))]
    LockNotAcquired {
        /// Current holder, if recorded.
        locked_by: Option<String>,
    },

    /// `tag` was called before any change set ran.
    #[error("Cannot tag an empty database")]
    NothingToTag,

    /// The connection URL does not name a supported database.
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    /// The dialect name is not one of the supported short names.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// Multiple errors occurred.
    #[error("Multiple errors occurred:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Multiple(Vec<MigrateError>),
}

/// Result type for changelog operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
