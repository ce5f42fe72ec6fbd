//! Error types for Formgate
//!
//! Every failure the request lifecycle can observe is a `FormgateError`.
//! Lower layers (row store, session store) define their own error enums and
//! convert into this one at the crate boundary.
//!
//! ## Categories
//!
//! | Category | Variants | Presentation |
//! |----------|----------|--------------|
//! | DuplicateSubmission | `DuplicateSubmission` | re-render with neutral notice |
//! | Validation | `Validation` | re-render with field messages |
//! | DataChanged | `OptimisticConflict`, `StaleOrDeleted` | re-render or list redirect, same notice |
//! | Fatal | everything else | generic failure page |
//!
//! A missing redirect context is not an error at all; restore returns `None`.

use crate::message::Message;
use thiserror::Error;

/// Result type alias for Formgate operations
pub type FormgateResult<T> = std::result::Result<T, FormgateError>;

/// How the orchestrator presents an error to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The action behind a transaction token was already processed
    DuplicateSubmission,
    /// Required-field or structural validation failed
    Validation,
    /// Someone else changed (or removed) the data being edited
    DataChanged,
    /// Anything else; surfaced to a generic error page and never retried
    Fatal,
}

/// Error types for the request lifecycle
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormgateError {
    /// Transaction token was absent from a session that carries a token set
    #[error("duplicate submission: transaction token {token:?} was already processed")]
    DuplicateSubmission {
        /// The token presented by the request (may be empty if none was sent)
        token: String,
    },

    /// Required-field or structural validation failed
    #[error("validation failed with {} message(s)", messages.len())]
    Validation {
        /// Field-scoped messages to attach to the re-rendered form
        messages: Vec<Message>,
    },

    /// Version vector captured at render time no longer matches the store
    ///
    /// Raised by the explicit pre-check; a native conflicting-write signal
    /// from the row store converts to this same variant.
    #[error("optimistic conflict on {entity}")]
    OptimisticConflict {
        /// Table and primary key of the conflicting row
        entity: String,
    },

    /// The row being edited no longer exists (or is soft-deleted)
    #[error("stale or deleted: {entity}")]
    StaleOrDeleted {
        /// Table and primary key of the missing row
        entity: String,
    },

    /// Caller broke a documented contract (e.g. a missing version vector)
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Row-store failure
    #[error("store error: {0}")]
    Store(String),

    /// Session-store failure
    #[error("session error: {0}")]
    Session(String),

    /// Encoding or decoding of a per-session blob failed
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl FormgateError {
    /// Create a duplicate submission error for the given token
    pub fn duplicate_submission(token: impl Into<String>) -> Self {
        FormgateError::DuplicateSubmission {
            token: token.into(),
        }
    }

    /// Create a validation error from a list of messages
    pub fn validation(messages: Vec<Message>) -> Self {
        FormgateError::Validation { messages }
    }

    /// Create an optimistic conflict error
    pub fn optimistic_conflict(entity: impl Into<String>) -> Self {
        FormgateError::OptimisticConflict {
            entity: entity.into(),
        }
    }

    /// Create a stale-or-deleted error
    pub fn stale_or_deleted(entity: impl Into<String>) -> Self {
        FormgateError::StaleOrDeleted {
            entity: entity.into(),
        }
    }

    /// Create a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        FormgateError::ContractViolation(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        FormgateError::Store(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        FormgateError::Session(msg.into())
    }

    /// Create a codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        FormgateError::Codec(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        FormgateError::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        FormgateError::Internal(msg.into())
    }

    /// Presentation category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            FormgateError::DuplicateSubmission { .. } => ErrorCategory::DuplicateSubmission,
            FormgateError::Validation { .. } => ErrorCategory::Validation,
            FormgateError::OptimisticConflict { .. } | FormgateError::StaleOrDeleted { .. } => {
                ErrorCategory::DataChanged
            }
            FormgateError::ContractViolation(_)
            | FormgateError::Store(_)
            | FormgateError::Session(_)
            | FormgateError::Codec(_)
            | FormgateError::Config(_)
            | FormgateError::Internal(_) => ErrorCategory::Fatal,
        }
    }

    /// Whether the orchestrator turns this error into a render/redirect
    pub fn is_recoverable(&self) -> bool {
        self.category() != ErrorCategory::Fatal
    }
}
