//! Unified conflict reporting
//!
//! A stale edit can be caught two ways: by the explicit pre-check in
//! [`find_and_check`], or by the row store itself when a concurrent writer
//! slips in between the check and the write. Both surface as
//! `FormgateError::OptimisticConflict { entity: "table#pk" }` (or
//! `StaleOrDeleted` when the lead row vanished), always naming the lead
//! row, so the caller cannot tell which path fired.

use crate::validation::{find_and_check, CheckedRows, RowRef};
use formgate_core::{FormgateError, FormgateResult, VersionVector};
use formgate_storage::{RowStore, StoreResult};
use tracing::warn;

/// Check the participating rows, then run `write` in the same unit of work
///
/// `write` receives the rows read by the check. Store errors it returns are
/// converted, so a native version conflict becomes the same
/// `OptimisticConflict` the pre-check raises, naming the lead row whichever
/// participating row the store rejected.
pub fn checked_write<S, T, F>(
    store: &mut S,
    rows: &[RowRef],
    client: Option<&VersionVector>,
    write: F,
) -> FormgateResult<T>
where
    S: RowStore + ?Sized,
    F: FnOnce(&mut S, &CheckedRows) -> StoreResult<T>,
{
    let checked = find_and_check(&*store, rows, client)?;
    write(store, &checked).map_err(|e| {
        let err = FormgateError::from(e);
        if let Some(entity) = data_changed_entity(&err) {
            warn!(target: "formgate::lifecycle", entity, "Row store rejected a stale write");
        }
        attribute_to_lead(err, rows.first())
    })
}

/// Rewrite a native data-changed error the way the pre-check reports it
///
/// The pre-check reports `StaleOrDeleted` only for a missing lead row and
/// names the lead row in every conflict.
fn attribute_to_lead(err: FormgateError, lead: Option<&RowRef>) -> FormgateError {
    let Some(lead) = lead else {
        return err;
    };
    let lead_ref = lead.entity_ref();
    match err {
        FormgateError::StaleOrDeleted { entity } if entity == lead_ref => {
            FormgateError::stale_or_deleted(entity)
        }
        FormgateError::StaleOrDeleted { .. } | FormgateError::OptimisticConflict { .. } => {
            FormgateError::optimistic_conflict(lead_ref)
        }
        other => other,
    }
}

/// Entity named by a data-changed error, `None` for other errors
pub fn data_changed_entity(err: &FormgateError) -> Option<&str> {
    match err {
        FormgateError::OptimisticConflict { entity } | FormgateError::StaleOrDeleted { entity } => {
            Some(entity)
        }
        _ => None,
    }
}
