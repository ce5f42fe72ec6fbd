//! Row-store errors
//!
//! `StoreError` converts into `FormgateError` at the crate boundary. The
//! conversion is where a native conflicting-write signal becomes the same
//! `OptimisticConflict` the explicit version pre-check raises.

use formgate_core::FormgateError;
use thiserror::Error;

/// Result type alias for row-store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Row-store failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Table was never registered
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Insert/update would duplicate a primary or natural key
    #[error("unique constraint violated on {table}: {key}")]
    UniqueViolation {
        /// Table name
        table: String,
        /// The duplicated key value
        key: String,
    },

    /// Native optimistic-lock failure: row version changed under the writer
    #[error("version conflict on {table}#{primary_key}")]
    VersionConflict {
        /// Table name
        table: String,
        /// Primary key of the row
        primary_key: String,
    },

    /// Row does not exist (or is not visible)
    #[error("row not found: {table}#{primary_key}")]
    NotFound {
        /// Table name
        table: String,
        /// Primary key of the row
        primary_key: String,
    },

    /// Backend I/O failure
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for FormgateError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict { table, primary_key } => {
                FormgateError::optimistic_conflict(format!("{}#{}", table, primary_key))
            }
            StoreError::NotFound { table, primary_key } => {
                FormgateError::stale_or_deleted(format!("{}#{}", table, primary_key))
            }
            StoreError::UnknownTable(table) => {
                FormgateError::contract(format!("table {} is not registered", table))
            }
            other @ (StoreError::UniqueViolation { .. } | StoreError::Backend(_)) => {
                FormgateError::store(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgate_core::ErrorCategory;

    #[test]
    fn test_native_conflict_maps_to_optimistic_conflict() {
        let err: FormgateError = StoreError::VersionConflict {
            table: "orders".into(),
            primary_key: "7".into(),
        }
        .into();
        assert_eq!(err, FormgateError::optimistic_conflict("orders#7"));
        assert_eq!(err.category(), ErrorCategory::DataChanged);
    }

    #[test]
    fn test_not_found_maps_to_stale() {
        let err: FormgateError = StoreError::NotFound {
            table: "orders".into(),
            primary_key: "7".into(),
        }
        .into();
        assert_eq!(err, FormgateError::stale_or_deleted("orders#7"));
    }

    #[test]
    fn test_unique_violation_is_fatal() {
        let err: FormgateError = StoreError::UniqueViolation {
            table: "items".into(),
            key: "SKU-1".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Fatal);
        assert!(err.to_string().contains("SKU-1"));
    }

    #[test]
    fn test_unknown_table_is_contract_violation() {
        let err: FormgateError = StoreError::UnknownTable("ghost".into()).into();
        assert!(matches!(err, FormgateError::ContractViolation(_)));
    }
}
