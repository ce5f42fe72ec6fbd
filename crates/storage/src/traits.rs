//! The row-store surface the lifecycle depends on
//!
//! One `RowStore` value is one unit of work. Reads honor the unit of work's
//! enabled visibility filters; writes and uniqueness checks see every
//! physical row. Physical deletes are deferred until [`RowStore::flush`].

use crate::error::StoreResult;
use crate::filter::VisibilityFilters;
use crate::row::{StoredRow, TableSchema};

/// Unit-of-work access to stored rows
pub trait RowStore: VisibilityFilters {
    /// Schema of a registered table
    fn schema(&self, table: &str) -> StoreResult<TableSchema>;

    /// Visible row with the given primary key
    fn find_by_primary(&self, table: &str, primary_key: &str) -> StoreResult<Option<StoredRow>>;

    /// Visible rows carrying the given natural key
    fn find_by_natural_key(&self, table: &str, natural_key: &str) -> StoreResult<Vec<StoredRow>>;

    /// Insert a new row, returning its assigned version
    ///
    /// Fails with `UniqueViolation` if any physical row (visible or not)
    /// holds the same primary key, or the same natural key in the same scope.
    fn insert(&mut self, row: StoredRow) -> StoreResult<String>;

    /// Replace a visible row, returning its new version
    ///
    /// Fails with `VersionConflict` if the stored version differs from
    /// `expected_version`.
    fn update(&mut self, row: StoredRow, expected_version: &str) -> StoreResult<String>;

    /// Delete a visible row the way its table declares
    ///
    /// Soft-delete tables get the flag set (and a new version); other tables
    /// get a physical delete, deferred until flush.
    fn mark_deleted(
        &mut self,
        table: &str,
        primary_key: &str,
        expected_version: &str,
    ) -> StoreResult<()>;

    /// Physically remove a row, visible or not, at the next flush
    fn delete(&mut self, table: &str, primary_key: &str) -> StoreResult<()>;

    /// Apply deferred deletes, returning how many rows were removed
    fn flush(&mut self) -> StoreResult<usize>;
}
