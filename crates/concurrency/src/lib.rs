//! Concurrency layer for Formgate
//!
//! This crate keeps edits correct when several sessions race on the same rows:
//! - validation: Optimistic "find-and-check" against a client version vector
//! - conflict: One error shape for pre-check and native store conflicts
//! - reconcile: Purge soft-deleted rows that would block an insert/update

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod reconcile;
pub mod validation;

pub use conflict::{checked_write, data_changed_entity};
pub use reconcile::{ReconcileReport, SoftDeleteReconciler};
pub use validation::{capture_versions, find_and_check, CheckedRows, RowRef};
