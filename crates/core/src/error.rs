//! Unified error types for the consultation core.
//!
//! Expected failures are values: store operations, illegal transitions, and
//! validation problems all surface as `Err`, never as panics, across every
//! public API boundary.

use thiserror::Error;

use crate::call::CallStatus;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the consultation core.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A document with this id already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A compare-and-swap write lost to a concurrent writer.
    #[error("version conflict on {collection}/{id}: expected {expected}, found {found}")]
    Conflict {
        collection: String,
        id: String,
        expected: u64,
        found: u64,
    },

    /// The requested call status change is not a legal transition.
    #[error("illegal call transition: {from} -> {to}")]
    InvalidTransition { from: CallStatus, to: CallStatus },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing document store failed (network, permissions, shutdown).
    #[error("store error: {0}")]
    Store(String),

    /// The media transport failed.
    #[error("media error: {0}")]
    Media(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is a lost compare-and-swap race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether this error is a missing-document read.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
