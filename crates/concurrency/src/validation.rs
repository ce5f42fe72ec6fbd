//! Optimistic find-and-check
//!
//! When an edit form is rendered, the versions of every participating row
//! are captured into a `VersionVector` and round-tripped through the page.
//! On submit, `find_and_check` re-reads the same rows and compares.
//!
//! Rules:
//! - Participating rows are given by the caller, in order; that order is
//!   the order of the vector
//! - The first row is the lead row. If it is gone, the edit fails with
//!   `StaleOrDeleted`
//! - Any other missing row contributes `VersionVector::ABSENT`, so a row
//!   that appears or disappears after render is still a mismatch
//! - A missing client vector is a contract violation, never "no check"
//! - An empty participation list yields an empty vector, which equals
//!   another empty vector

use formgate_core::version::same_as;
use formgate_core::{FormgateError, FormgateResult, VersionVector};
use formgate_storage::{RowStore, StoredRow};
use tracing::warn;

/// A row participating in one logical edit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowRef {
    /// Table name
    pub table: String,
    /// Primary key
    pub primary_key: String,
}

impl RowRef {
    /// Reference a row by table and primary key
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
        }
    }

    /// `table#primary_key`
    pub fn entity_ref(&self) -> String {
        format!("{}#{}", self.table, self.primary_key)
    }
}

/// Rows read by a successful check, in participation order
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedRows {
    /// Current rows; `None` for dependents that do not exist
    pub rows: Vec<Option<StoredRow>>,
    /// Their versions, equal to the client vector
    pub versions: VersionVector,
}

impl CheckedRows {
    /// The lead row, if any rows participated
    pub fn lead(&self) -> Option<&StoredRow> {
        self.rows.first().and_then(Option::as_ref)
    }
}

fn read_rows<S: RowStore + ?Sized>(
    store: &S,
    rows: &[RowRef],
) -> FormgateResult<Vec<Option<StoredRow>>> {
    rows.iter()
        .map(|r| {
            store
                .find_by_primary(&r.table, &r.primary_key)
                .map_err(FormgateError::from)
        })
        .collect()
}

fn versions_of(rows: &[Option<StoredRow>]) -> VersionVector {
    VersionVector::capture(rows.iter().map(|r| r.as_ref().map(|r| r.version.as_str())))
}

/// Capture the current version vector of the participating rows
///
/// Used at render time; missing rows (including a missing lead) become
/// [`VersionVector::ABSENT`].
pub fn capture_versions<S: RowStore + ?Sized>(
    store: &S,
    rows: &[RowRef],
) -> FormgateResult<VersionVector> {
    Ok(versions_of(&read_rows(store, rows)?))
}

/// Re-read the participating rows and compare against the client vector
///
/// # Errors
///
/// - `StaleOrDeleted` if the lead row no longer exists (or is no longer
///   visible in this unit of work)
/// - `OptimisticConflict` if the current vector differs from `client`
/// - `ContractViolation` if `client` is `None`
/// - whatever the row store reports, converted
pub fn find_and_check<S: RowStore + ?Sized>(
    store: &S,
    rows: &[RowRef],
    client: Option<&VersionVector>,
) -> FormgateResult<CheckedRows> {
    let current = read_rows(store, rows)?;

    if let (Some(lead), Some(None)) = (rows.first(), current.first()) {
        warn!(target: "formgate::lifecycle", entity = %lead.entity_ref(), "Edited row no longer exists");
        return Err(FormgateError::stale_or_deleted(lead.entity_ref()));
    }

    let versions = versions_of(&current);
    if !same_as(Some(&versions), client)? {
        let entity = rows
            .first()
            .map(RowRef::entity_ref)
            .unwrap_or_default();
        warn!(
            target: "formgate::lifecycle",
            %entity,
            current = %versions,
            "Version vector mismatch"
        );
        return Err(FormgateError::optimistic_conflict(entity));
    }

    Ok(CheckedRows {
        rows: current,
        versions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use formgate_core::{RowIdentity, TenantScope};
    use formgate_storage::{MemoryRowStore, TableSchema};

    fn setup() -> (MemoryRowStore, String, String) {
        let store = MemoryRowStore::new();
        store.register(TableSchema::new("orders").soft_delete());
        store.register(TableSchema::new("lines"));
        let mut uow = store.begin();
        let scope = TenantScope::new("t1");
        let v_order = uow
            .insert(StoredRow::new("orders", RowIdentity::new("o1", scope.clone())))
            .unwrap();
        let v_line = uow
            .insert(StoredRow::new("lines", RowIdentity::new("l1", scope)))
            .unwrap();
        (store, v_order, v_line)
    }

    fn refs() -> Vec<RowRef> {
        vec![RowRef::new("orders", "o1"), RowRef::new("lines", "l1")]
    }

    #[test]
    fn test_unchanged_rows_pass() {
        let (store, v_order, v_line) = setup();
        let uow = store.begin_scoped(&TenantScope::new("t1"));
        let client = VersionVector::from_tokens([v_order.as_str(), v_line.as_str()]);

        let checked = find_and_check(&uow, &refs(), Some(&client)).unwrap();
        assert_eq!(checked.versions, client);
        assert_eq!(checked.lead().unwrap().primary_key(), "o1");
    }

    #[test]
    fn test_capture_matches_check() {
        let (store, _, _) = setup();
        let uow = store.begin();
        let captured = capture_versions(&uow, &refs()).unwrap();
        assert!(find_and_check(&uow, &refs(), Some(&captured)).is_ok());
    }

    #[test]
    fn test_changed_dependent_is_conflict() {
        let (store, v_order, v_line) = setup();
        let client = VersionVector::from_tokens([v_order.as_str(), v_line.as_str()]);

        let mut other = store.begin();
        let line = other.find_by_primary("lines", "l1").unwrap().unwrap();
        other.update(line, &v_line).unwrap();

        let uow = store.begin();
        assert_eq!(
            find_and_check(&uow, &refs(), Some(&client)),
            Err(FormgateError::optimistic_conflict("orders#o1"))
        );
    }

    #[test]
    fn test_order_matters() {
        let (store, v_order, v_line) = setup();
        let swapped = VersionVector::from_tokens([v_line.as_str(), v_order.as_str()]);
        let uow = store.begin();
        assert!(matches!(
            find_and_check(&uow, &refs(), Some(&swapped)),
            Err(FormgateError::OptimisticConflict { .. })
        ));
    }

    #[test]
    fn test_deleted_lead_is_stale() {
        let (store, v_order, v_line) = setup();
        let client = VersionVector::from_tokens([v_order.as_str(), v_line.as_str()]);

        let mut other = store.begin_scoped(&TenantScope::new("t1"));
        other.mark_deleted("orders", "o1", &v_order).unwrap();

        let uow = store.begin_scoped(&TenantScope::new("t1"));
        assert_eq!(
            find_and_check(&uow, &refs(), Some(&client)),
            Err(FormgateError::stale_or_deleted("orders#o1"))
        );
    }

    #[test]
    fn test_missing_dependent_uses_sentinel() {
        let (store, v_order, _) = setup();
        let refs = vec![RowRef::new("orders", "o1"), RowRef::new("lines", "nope")];
        let client = VersionVector::from_tokens([v_order.as_str(), VersionVector::ABSENT]);
        let uow = store.begin();

        let checked = find_and_check(&uow, &refs, Some(&client)).unwrap();
        assert_eq!(checked.rows[1], None);
    }

    #[test]
    fn test_empty_participation() {
        let (store, _, _) = setup();
        let uow = store.begin();
        let checked = find_and_check(&uow, &[], Some(&VersionVector::new())).unwrap();
        assert!(checked.rows.is_empty());
        assert!(checked.lead().is_none());
    }

    #[test]
    fn test_missing_client_vector_is_contract_violation() {
        let (store, _, _) = setup();
        let uow = store.begin();
        let err = find_and_check(&uow, &refs(), None).unwrap_err();
        assert!(matches!(err, FormgateError::ContractViolation(_)));
        assert!(!err.is_recoverable());
    }
}
