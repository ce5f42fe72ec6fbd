//! MemoryRowStore: in-memory row store with per-unit-of-work filters
//!
//! This module implements `RowStore` using:
//! - `FxHashMap<table, BTreeMap<primary_key, StoredRow>>` for row storage
//! - `parking_lot::RwLock` for thread-safe access
//! - `AtomicU64` for monotonically increasing row versions
//!
//! # Design Notes
//!
//! - **Shared rows, private filters**: every `UnitOfWork` sees the same rows
//!   but carries its own `FilterState`
//! - **Deferred physical deletes**: `delete` queues; `flush` removes. Until
//!   the flush, the queued row is hidden from reads but still holds its keys
//! - **Uniqueness is physical**: primary keys are unique per table across all
//!   scopes; natural keys are unique per scope (per table if not scoped),
//!   counting soft-deleted rows
//! - **Unflushed deletes are discarded** when a unit of work is dropped

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use formgate_core::TenantScope;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::filter::{
    FilterParams, FilterState, VisibilityFilters, SOFT_DELETE_FILTER, TENANT_FILTER,
    TENANT_SCOPE_PARAM,
};
use crate::row::{StoredRow, TableSchema};
use crate::traits::RowStore;

#[derive(Debug, Default)]
struct Tables {
    schemas: FxHashMap<String, TableSchema>,
    rows: FxHashMap<String, BTreeMap<String, StoredRow>>,
}

impl Tables {
    fn schema(&self, table: &str) -> StoreResult<&TableSchema> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn rows(&self, table: &str) -> impl Iterator<Item = &StoredRow> {
        self.rows.get(table).into_iter().flat_map(|m| m.values())
    }

    /// Physical row holding `row`'s natural key in the same uniqueness domain
    fn natural_key_holder(&self, schema: &TableSchema, row: &StoredRow) -> Option<&StoredRow> {
        let nk = row.identity.natural_key.as_deref()?;
        self.rows(&schema.name).find(|other| {
            other.primary_key() != row.primary_key()
                && other.identity.natural_key.as_deref() == Some(nk)
                && (!schema.tenant_scoped || other.identity.scope == row.identity.scope)
        })
    }
}

/// In-memory row store
///
/// Cloning is cheap; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    tables: Arc<RwLock<Tables>>,
    version: Arc<AtomicU64>,
}

impl MemoryRowStore {
    /// Create an empty store with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a table schema
    pub fn register(&self, schema: TableSchema) {
        let mut tables = self.tables.write();
        tables.rows.entry(schema.name.clone()).or_default();
        tables.schemas.insert(schema.name.clone(), schema);
    }

    /// Open a unit of work with no filters enabled
    pub fn begin(&self) -> UnitOfWork {
        UnitOfWork {
            tables: Arc::clone(&self.tables),
            version: Arc::clone(&self.version),
            filters: FilterState::new(),
            pending_deletes: Vec::new(),
        }
    }

    /// Open a unit of work as a request sees it: soft-deleted rows hidden and
    /// tenant filter bound to `scope`
    pub fn begin_scoped(&self, scope: &TenantScope) -> UnitOfWork {
        let mut uow = self.begin();
        uow.enable_filter(SOFT_DELETE_FILTER, FilterParams::new());
        let mut params = FilterParams::new();
        params.insert(TENANT_SCOPE_PARAM.to_string(), scope.as_str().to_string());
        uow.enable_filter(TENANT_FILTER, params);
        uow
    }

    /// Physical row, bypassing every filter
    pub fn physical_row(&self, table: &str, primary_key: &str) -> Option<StoredRow> {
        self.tables
            .read()
            .rows
            .get(table)
            .and_then(|m| m.get(primary_key))
            .cloned()
    }

    /// Number of physical rows in a table, soft-deleted included
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().rows.get(table).map_or(0, |m| m.len())
    }
}

/// One unit of work against a [`MemoryRowStore`]
#[derive(Debug)]
pub struct UnitOfWork {
    tables: Arc<RwLock<Tables>>,
    version: Arc<AtomicU64>,
    filters: FilterState,
    pending_deletes: Vec<(String, String)>,
}

impl UnitOfWork {
    /// Number of queued physical deletes
    pub fn pending_deletes(&self) -> usize {
        self.pending_deletes.len()
    }

    fn next_version(&self) -> String {
        (self.version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn is_pending_delete(&self, table: &str, primary_key: &str) -> bool {
        self.pending_deletes
            .iter()
            .any(|(t, pk)| t == table && pk == primary_key)
    }

    fn is_visible(&self, schema: &TableSchema, row: &StoredRow) -> bool {
        if schema.soft_delete && row.deleted && self.filters.is_enabled(SOFT_DELETE_FILTER) {
            return false;
        }
        if schema.tenant_scoped {
            let bound = self
                .filters
                .params(TENANT_FILTER)
                .and_then(|p| p.get(TENANT_SCOPE_PARAM));
            if let Some(scope) = bound {
                if row.identity.scope.as_str() != scope {
                    return false;
                }
            }
        }
        !self.is_pending_delete(&row.table, row.primary_key())
    }

    fn visible_row(&self, tables: &Tables, table: &str, primary_key: &str) -> StoreResult<StoredRow> {
        let schema = tables.schema(table)?;
        tables
            .rows
            .get(table)
            .and_then(|m| m.get(primary_key))
            .filter(|row| self.is_visible(schema, row))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                primary_key: primary_key.to_string(),
            })
    }
}

impl VisibilityFilters for UnitOfWork {
    fn enable_filter(&mut self, name: &str, params: FilterParams) {
        self.filters.enable(name, params);
    }

    fn disable_filter(&mut self, name: &str) {
        self.filters.disable(name);
    }

    fn filter_params(&self, name: &str) -> Option<&FilterParams> {
        self.filters.params(name)
    }
}

impl RowStore for UnitOfWork {
    fn schema(&self, table: &str) -> StoreResult<TableSchema> {
        self.tables.read().schema(table).cloned()
    }

    fn find_by_primary(&self, table: &str, primary_key: &str) -> StoreResult<Option<StoredRow>> {
        let tables = self.tables.read();
        match self.visible_row(&tables, table, primary_key) {
            Ok(row) => Ok(Some(row)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn find_by_natural_key(&self, table: &str, natural_key: &str) -> StoreResult<Vec<StoredRow>> {
        let tables = self.tables.read();
        let schema = tables.schema(table)?;
        Ok(tables
            .rows(table)
            .filter(|row| row.identity.natural_key.as_deref() == Some(natural_key))
            .filter(|row| self.is_visible(schema, row))
            .cloned()
            .collect())
    }

    fn insert(&mut self, mut row: StoredRow) -> StoreResult<String> {
        let mut tables = self.tables.write();
        let schema = tables.schema(&row.table)?.clone();

        if tables
            .rows
            .get(&schema.name)
            .is_some_and(|m| m.contains_key(row.primary_key()))
        {
            return Err(StoreError::UniqueViolation {
                table: schema.name,
                key: row.primary_key().to_string(),
            });
        }
        if let Some(holder) = tables.natural_key_holder(&schema, &row) {
            return Err(StoreError::UniqueViolation {
                table: schema.name,
                key: holder.identity.natural_key.clone().unwrap_or_default(),
            });
        }

        let version = self.next_version();
        row.version = version.clone();
        row.table = schema.name.clone();
        debug!(target: "formgate::store", table = %schema.name, primary_key = %row.primary_key(), %version, "Row inserted");
        tables
            .rows
            .entry(schema.name)
            .or_default()
            .insert(row.primary_key().to_string(), row);
        Ok(version)
    }

    fn update(&mut self, mut row: StoredRow, expected_version: &str) -> StoreResult<String> {
        let mut tables = self.tables.write();
        let current = self.visible_row(&tables, &row.table, row.primary_key())?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                table: row.table,
                primary_key: row.identity.primary_key,
            });
        }
        let schema = tables.schema(&row.table)?.clone();
        if let Some(holder) = tables.natural_key_holder(&schema, &row) {
            return Err(StoreError::UniqueViolation {
                table: schema.name,
                key: holder.identity.natural_key.clone().unwrap_or_default(),
            });
        }

        let version = self.next_version();
        row.version = version.clone();
        debug!(target: "formgate::store", table = %schema.name, primary_key = %row.primary_key(), %version, "Row updated");
        tables
            .rows
            .entry(schema.name)
            .or_default()
            .insert(row.primary_key().to_string(), row);
        Ok(version)
    }

    fn mark_deleted(
        &mut self,
        table: &str,
        primary_key: &str,
        expected_version: &str,
    ) -> StoreResult<()> {
        let soft = {
            let mut tables = self.tables.write();
            let current = self.visible_row(&tables, table, primary_key)?;
            if current.version != expected_version {
                return Err(StoreError::VersionConflict {
                    table: table.to_string(),
                    primary_key: primary_key.to_string(),
                });
            }
            let soft = tables.schema(table)?.soft_delete;
            if soft {
                let version = self.next_version();
                if let Some(row) = tables.rows.get_mut(table).and_then(|m| m.get_mut(primary_key)) {
                    row.deleted = true;
                    row.version = version;
                }
            }
            soft
        };
        if soft {
            debug!(target: "formgate::store", table, primary_key, "Row flagged deleted");
            Ok(())
        } else {
            self.delete(table, primary_key)
        }
    }

    fn delete(&mut self, table: &str, primary_key: &str) -> StoreResult<()> {
        {
            let tables = self.tables.read();
            tables.schema(table)?;
            let exists = tables
                .rows
                .get(table)
                .is_some_and(|m| m.contains_key(primary_key));
            if !exists {
                return Err(StoreError::NotFound {
                    table: table.to_string(),
                    primary_key: primary_key.to_string(),
                });
            }
        }
        if !self.is_pending_delete(table, primary_key) {
            self.pending_deletes
                .push((table.to_string(), primary_key.to_string()));
        }
        debug!(target: "formgate::store", table, primary_key, "Physical delete queued");
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<usize> {
        if self.pending_deletes.is_empty() {
            return Ok(0);
        }
        let mut tables = self.tables.write();
        let mut removed = 0;
        for (table, primary_key) in self.pending_deletes.drain(..) {
            if let Some(rows) = tables.rows.get_mut(&table) {
                if rows.remove(&primary_key).is_some() {
                    removed += 1;
                }
            }
        }
        debug!(target: "formgate::store", removed, "Unit of work flushed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgate_core::RowIdentity;

    fn item(pk: &str, sku: &str, scope: &str) -> StoredRow {
        StoredRow::new(
            "items",
            RowIdentity::new(pk, TenantScope::new(scope)).with_natural_key(sku),
        )
        .with_field("sku", sku)
    }

    fn store() -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store.register(
            TableSchema::new("items")
                .soft_delete()
                .tenant_scoped()
                .natural_key("sku"),
        );
        store.register(TableSchema::new("notes"));
        store
    }

    #[test]
    fn test_insert_assigns_increasing_versions() {
        let store = store();
        let mut uow = store.begin();
        let v1 = uow.insert(item("1", "A", "t1")).unwrap();
        let v2 = uow.insert(item("2", "B", "t1")).unwrap();
        assert_ne!(v1, v2);
        assert!(v2.parse::<u64>().unwrap() > v1.parse::<u64>().unwrap());
        assert_eq!(uow.find_by_primary("items", "1").unwrap().unwrap().version, v1);
    }

    #[test]
    fn test_unknown_table() {
        let store = store();
        let uow = store.begin();
        assert_eq!(
            uow.find_by_primary("ghost", "1"),
            Err(StoreError::UnknownTable("ghost".into()))
        );
    }

    #[test]
    fn test_primary_key_unique_across_scopes() {
        let store = store();
        let mut uow = store.begin();
        uow.insert(item("1", "A", "t1")).unwrap();
        let err = uow.insert(item("1", "Z", "t2")).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref key, .. } if key == "1"));
    }

    #[test]
    fn test_natural_key_unique_per_scope() {
        let store = store();
        let mut uow = store.begin();
        uow.insert(item("1", "A", "t1")).unwrap();
        uow.insert(item("2", "A", "t2")).unwrap();
        let err = uow.insert(item("3", "A", "t1")).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { ref key, .. } if key == "A"));
    }

    #[test]
    fn test_soft_deleted_rows_hidden_but_still_unique() {
        let store = store();
        let mut uow = store.begin_scoped(&TenantScope::new("t1"));
        let v = uow.insert(item("1", "A", "t1")).unwrap();
        uow.mark_deleted("items", "1", &v).unwrap();

        assert_eq!(uow.find_by_primary("items", "1").unwrap(), None);
        assert!(uow.find_by_natural_key("items", "A").unwrap().is_empty());
        assert!(store.physical_row("items", "1").unwrap().deleted);

        assert!(matches!(
            uow.insert(item("9", "A", "t1")),
            Err(StoreError::UniqueViolation { .. })
        ));
    }

    #[test]
    fn test_tenant_filter_hides_other_scopes() {
        let store = store();
        store.begin().insert(item("1", "A", "t2")).unwrap();

        let uow = store.begin_scoped(&TenantScope::new("t1"));
        assert_eq!(uow.find_by_primary("items", "1").unwrap(), None);

        let unfiltered = store.begin();
        assert!(unfiltered.find_by_primary("items", "1").unwrap().is_some());
    }

    #[test]
    fn test_update_native_version_check() {
        let store = store();
        let mut uow = store.begin();
        let v1 = uow.insert(item("1", "A", "t1")).unwrap();
        let v2 = uow
            .update(item("1", "A", "t1").with_field("qty", 3i64), &v1)
            .unwrap();

        let err = uow.update(item("1", "A", "t1"), &v1).unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                table: "items".into(),
                primary_key: "1".into()
            }
        );
        let row = uow.find_by_primary("items", "1").unwrap().unwrap();
        assert_eq!(row.version, v2);
        assert_eq!(row.fields.get("qty"), Some(&formgate_core::Value::Int(3)));
    }

    #[test]
    fn test_update_invisible_row_is_not_found() {
        let store = store();
        let v = store.begin().insert(item("1", "A", "t2")).unwrap();
        let mut uow = store.begin_scoped(&TenantScope::new("t1"));
        assert!(matches!(
            uow.update(item("1", "A", "t2"), &v),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_physical_delete_deferred_until_flush() {
        let store = store();
        let mut uow = store.begin();
        uow.insert(item("1", "A", "t1")).unwrap();
        uow.delete("items", "1").unwrap();

        assert_eq!(uow.pending_deletes(), 1);
        assert_eq!(uow.find_by_primary("items", "1").unwrap(), None);
        // keys still held before the flush
        assert!(uow.insert(item("1", "B", "t1")).is_err());
        assert_eq!(store.row_count("items"), 1);

        assert_eq!(uow.flush().unwrap(), 1);
        assert_eq!(store.row_count("items"), 0);
        uow.insert(item("1", "A", "t1")).unwrap();
    }

    #[test]
    fn test_unflushed_deletes_discarded_on_drop() {
        let store = store();
        store.begin().insert(item("1", "A", "t1")).unwrap();
        {
            let mut uow = store.begin();
            uow.delete("items", "1").unwrap();
        }
        assert_eq!(store.row_count("items"), 1);
    }

    #[test]
    fn test_mark_deleted_on_plain_table_is_physical() {
        let store = store();
        let mut uow = store.begin();
        let note = StoredRow::new("notes", RowIdentity::new("n1", TenantScope::new("t1")));
        let v = uow.insert(note).unwrap();
        uow.mark_deleted("notes", "n1", &v).unwrap();
        assert_eq!(uow.flush().unwrap(), 1);
        assert_eq!(store.physical_row("notes", "n1"), None);
    }

    #[test]
    fn test_delete_missing_row() {
        let store = store();
        let mut uow = store.begin();
        assert!(matches!(
            uow.delete("items", "nope"),
            Err(StoreError::NotFound { .. })
        ));
    }
}
