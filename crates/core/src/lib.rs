//! Core types for Formgate
//!
//! This crate defines the foundational types shared by every layer of the
//! request-lifecycle subsystem:
//! - FormgateError: Error taxonomy and recoverability categories
//! - Value / ViewState: Transient UI state carried between requests
//! - Message / Messages: Ordered validation and info messages
//! - VersionVector: Ordered version tokens for optimistic concurrency
//! - RowIdentity / TenantScope: Identity of a row during reconciliation
//! - Pager: Pure pager-cell model
//! - FieldLookup: Compile-time field access by dotted path
//! - RequestContext: Explicit request-scoped context (no thread-locals)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod field;
pub mod identity;
pub mod limits;
pub mod message;
pub mod pager;
pub mod request;
pub mod value;
pub mod version;
pub mod view_state;

pub use error::{ErrorCategory, FormgateError, FormgateResult};
pub use field::{sort_by_field, FieldLookup, FieldPath, SortDirection};
pub use identity::{RowIdentity, TenantScope};
pub use limits::{CONTEXT_ID_PARAM, RESERVED_PARAMS, TRANSACTION_TOKEN_PARAM};
pub use message::{Message, MessageLevel, Messages};
pub use pager::{build_cells, CellKind, PagerCell};
pub use request::{LoginIdentity, RequestContext, RequestId, SessionId};
pub use value::Value;
pub use version::VersionVector;
pub use view_state::ViewState;
