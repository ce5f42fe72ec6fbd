//! Soft-delete reconciliation
//!
//! Ordinary deletes only flag rows. A later write whose primary key (or
//! natural key within the tenant scope) matches a flagged row would then
//! fail its uniqueness check against a row nobody can see. Before such a
//! write, `SoftDeleteReconciler::reconcile_before_write`:
//!
//! 1. Suspends the soft-delete filter, and the tenant filter when tenant
//!    scoping is in effect, on the caller's unit of work
//! 2. Physically deletes a flagged row with the same primary key, in any
//!    scope, and flushes
//! 3. Does the same for flagged rows holding the same natural key, if the
//!    table declares one
//! 4. Restores the filters to their prior state, including on error
//!
//! Tables without a soft-delete flag are left alone. Store failures during
//! the purge are fatal `Store` errors, never a recoverable data-changed
//! outcome.

use formgate_core::{FormgateError, FormgateResult, RowIdentity, TenantScope};
use formgate_storage::{
    FilterGuard, RowStore, StoreError, StoredRow, TableSchema, SOFT_DELETE_FILTER, TENANT_FILTER,
};
use tracing::{debug, info};

/// What one reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// The table declares no soft-delete flag; nothing was looked at
    pub skipped: bool,
    /// Flagged rows purged because they held the written row's primary key
    pub purged_by_primary: Vec<RowIdentity>,
    /// Flagged rows purged because they held the written row's natural key
    pub purged_by_natural_key: Vec<RowIdentity>,
}

impl ReconcileReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Total rows purged
    pub fn purged(&self) -> usize {
        self.purged_by_primary.len() + self.purged_by_natural_key.len()
    }
}

/// Purges soft-deleted rows that would block a write
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftDeleteReconciler;

impl SoftDeleteReconciler {
    /// Create a reconciler
    pub fn new() -> Self {
        Self
    }

    /// Purge flagged rows colliding with `row`, before the caller writes it
    ///
    /// `tenant_scope` is the scope the write happens in; `None` means the
    /// row's own scope. When given, the tenant filter is suspended as well.
    /// On tenant-scoped tables natural-key collisions are looked for only
    /// inside that scope. Primary-key collisions are always looked for
    /// across all scopes.
    ///
    /// The row being written is never purged, even if it is itself flagged.
    pub fn reconcile_before_write<S: RowStore + ?Sized>(
        &self,
        store: &mut S,
        row: &StoredRow,
        tenant_scope: Option<&TenantScope>,
    ) -> FormgateResult<ReconcileReport> {
        let schema = store.schema(&row.table)?;
        if !schema.soft_delete {
            debug!(target: "formgate::reconcile", table = %row.table, "No soft-delete flag; reconciliation skipped");
            return Ok(ReconcileReport::skipped());
        }

        let mut filters = vec![SOFT_DELETE_FILTER];
        if tenant_scope.is_some() || store.filter_enabled(TENANT_FILTER) {
            filters.push(TENANT_FILTER);
        }

        let mut guard = FilterGuard::suspend(store, &filters);
        let mut report = ReconcileReport::default();

        if let Some(found) = guard
            .find_by_primary(&row.table, row.primary_key())
            .map_err(purge_failed)?
        {
            if found.deleted && !is_same_write(&found, row) {
                guard
                    .delete(&found.table, found.primary_key())
                    .map_err(purge_failed)?;
                guard.flush().map_err(purge_failed)?;
                report.purged_by_primary.push(found.identity);
            }
        }

        if let (Some(_), Some(natural_key)) =
            (&schema.natural_key, row.identity.natural_key.as_deref())
        {
            let mut purged_any = false;
            let candidates = guard
                .find_by_natural_key(&row.table, natural_key)
                .map_err(purge_failed)?;
            for found in candidates {
                if !found.deleted
                    || found.primary_key() == row.primary_key()
                    || !in_uniqueness_domain(&schema, &found, row, tenant_scope)
                {
                    continue;
                }
                guard
                    .delete(&found.table, found.primary_key())
                    .map_err(purge_failed)?;
                report.purged_by_natural_key.push(found.identity);
                purged_any = true;
            }
            if purged_any {
                guard.flush().map_err(purge_failed)?;
            }
        }
        drop(guard);

        if report.purged() > 0 {
            info!(
                target: "formgate::reconcile",
                table = %row.table,
                primary_key = %row.primary_key(),
                by_primary = report.purged_by_primary.len(),
                by_natural_key = report.purged_by_natural_key.len(),
                "Purged soft-deleted rows before write"
            );
        } else {
            debug!(target: "formgate::reconcile", table = %row.table, primary_key = %row.primary_key(), "Nothing to purge");
        }
        Ok(report)
    }
}

/// Every store failure while purging is fatal, `NotFound` included
fn purge_failed(err: StoreError) -> FormgateError {
    FormgateError::store(format!("soft-delete reconciliation failed: {}", err))
}

/// `found` is the very row the caller is about to update
fn is_same_write(found: &StoredRow, row: &StoredRow) -> bool {
    !row.version.is_empty() && found.version == row.version
}

/// Natural keys of tenant-scoped tables are unique per scope only
fn in_uniqueness_domain(
    schema: &TableSchema,
    found: &StoredRow,
    row: &StoredRow,
    tenant_scope: Option<&TenantScope>,
) -> bool {
    !schema.tenant_scoped || found.scope() == tenant_scope.unwrap_or_else(|| row.scope())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgate_storage::{MemoryRowStore, VisibilityFilters};

    fn item(pk: &str, sku: &str, scope: &str) -> StoredRow {
        StoredRow::new(
            "items",
            RowIdentity::new(pk, TenantScope::new(scope)).with_natural_key(sku),
        )
    }

    fn store() -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store.register(
            TableSchema::new("items")
                .soft_delete()
                .tenant_scoped()
                .natural_key("sku"),
        );
        store.register(TableSchema::new("plain").natural_key("code"));
        store
    }

    fn flagged(store: &MemoryRowStore, row: StoredRow) {
        let mut uow = store.begin();
        let table = row.table.clone();
        let pk = row.primary_key().to_string();
        let v = uow.insert(row).unwrap();
        uow.mark_deleted(&table, &pk, &v).unwrap();
    }

    #[test]
    fn test_skipped_without_soft_delete() {
        let store = store();
        let mut uow = store.begin();
        let row = StoredRow::new("plain", RowIdentity::new("1", TenantScope::new("t1")));
        let report = SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &row, None)
            .unwrap();
        assert!(report.skipped);
        assert_eq!(report.purged(), 0);
    }

    #[test]
    fn test_natural_key_purge_stays_in_scope() {
        let store = store();
        flagged(&store, item("1", "SKU", "t1"));
        flagged(&store, item("2", "SKU", "t2"));

        let mut uow = store.begin_scoped(&TenantScope::new("t1"));
        let scope = TenantScope::new("t1");
        let report = SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &item("3", "SKU", "t1"), Some(&scope))
            .unwrap();

        assert_eq!(report.purged_by_natural_key.len(), 1);
        assert_eq!(report.purged_by_natural_key[0].primary_key, "1");
        assert!(store.physical_row("items", "1").is_none());
        assert!(store.physical_row("items", "2").is_some());
        uow.insert(item("3", "SKU", "t1")).unwrap();
    }

    #[test]
    fn test_natural_key_purge_defaults_to_row_scope() {
        let store = store();
        flagged(&store, item("9", "SKU", "t9"));

        let mut uow = store.begin_scoped(&TenantScope::new("t1"));
        let report = SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &item("1", "SKU", "t1"), None)
            .unwrap();

        assert!(report.purged_by_natural_key.is_empty());
        assert!(store.physical_row("items", "9").unwrap().deleted);
        uow.insert(item("1", "SKU", "t1")).unwrap();
    }

    #[test]
    fn test_live_rows_are_not_purged() {
        let store = store();
        store.begin().insert(item("1", "SKU", "t1")).unwrap();

        let mut uow = store.begin_scoped(&TenantScope::new("t1"));
        let report = SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &item("1", "SKU", "t1"), Some(&TenantScope::new("t1")))
            .unwrap();
        assert_eq!(report.purged(), 0);
        assert!(!report.skipped);
        assert!(uow.insert(item("1", "SKU", "t1")).is_err());
    }

    #[test]
    fn test_row_being_updated_is_not_purged() {
        let store = store();
        flagged(&store, item("1", "SKU", "t1"));
        let current = store.physical_row("items", "1").unwrap();

        let mut uow = store.begin();
        let report = SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &current, None)
            .unwrap();
        assert_eq!(report.purged(), 0);
        assert!(store.physical_row("items", "1").is_some());
    }

    #[test]
    fn test_filters_restored_after_success() {
        let store = store();
        flagged(&store, item("1", "SKU", "t1"));
        let scope = TenantScope::new("t2");
        let mut uow = store.begin_scoped(&scope);
        let before = (
            uow.filter_params(SOFT_DELETE_FILTER).cloned(),
            uow.filter_params(TENANT_FILTER).cloned(),
        );

        SoftDeleteReconciler::new()
            .reconcile_before_write(&mut uow, &item("1", "OTHER", "t2"), Some(&scope))
            .unwrap();

        let after = (
            uow.filter_params(SOFT_DELETE_FILTER).cloned(),
            uow.filter_params(TENANT_FILTER).cloned(),
        );
        assert_eq!(before, after);
    }
}
