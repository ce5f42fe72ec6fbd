//! Storage layer for Formgate
//!
//! This crate defines the narrow row-store surface the request lifecycle
//! consumes, plus an in-memory reference implementation:
//! - RowStore: Point lookups, writes, physical delete, flush barrier
//! - VisibilityFilters: Per-unit-of-work enable/disable of named filters
//! - FilterGuard: Scoped suspension of filters, restored on drop
//! - TableSchema / StoredRow: What a row type declares and what is stored
//! - MemoryRowStore / UnitOfWork: Reference implementation used by tests
//!
//! # Filters
//!
//! Two filters exist:
//! - `softDelete`: hides rows flagged deleted (tables declaring soft delete)
//! - `tenantScope`: hides rows outside the current tenant scope (tables
//!   declaring tenant scoping), parameterized by `scope`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod filter;
pub mod memory;
pub mod row;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filter::{
    FilterGuard, FilterParams, FilterState, VisibilityFilters, SOFT_DELETE_FILTER, TENANT_FILTER,
    TENANT_SCOPE_PARAM,
};
pub use memory::{MemoryRowStore, UnitOfWork};
pub use row::{StoredRow, TableSchema};
pub use traits::RowStore;
