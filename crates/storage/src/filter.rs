//! Row visibility filters
//!
//! A unit of work carries a set of named filters. Enabled filters hide rows
//! from every lookup the unit of work performs; they never affect writes or
//! uniqueness constraints, which always see every physical row.
//!
//! `FilterGuard` suspends filters for a lexical scope. On drop, each filter
//! returns to exactly the state (enabled with its parameters, or disabled)
//! it had when the guard was created. Drop runs on `?` early returns and on
//! unwinding, so filters cannot leak past the scope.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::trace;

/// Hides rows whose soft-delete flag is set
pub const SOFT_DELETE_FILTER: &str = "softDelete";

/// Hides rows outside the current tenant scope
pub const TENANT_FILTER: &str = "tenantScope";

/// Parameter of [`TENANT_FILTER`] naming the visible scope
pub const TENANT_SCOPE_PARAM: &str = "scope";

/// Parameters bound to an enabled filter
pub type FilterParams = BTreeMap<String, String>;

/// Enabled filters of one unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    enabled: FxHashMap<String, FilterParams>,
}

impl FilterState {
    /// No filters enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable (or re-parameterize) a filter
    pub fn enable(&mut self, name: &str, params: FilterParams) {
        self.enabled.insert(name.to_string(), params);
    }

    /// Disable a filter; no-op if it was not enabled
    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    /// Parameters of an enabled filter, `None` if disabled
    pub fn params(&self, name: &str) -> Option<&FilterParams> {
        self.enabled.get(name)
    }

    /// Whether a filter is enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains_key(name)
    }

    /// Number of enabled filters
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Whether no filter is enabled
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Anything that owns a [`FilterState`]
pub trait VisibilityFilters {
    /// Enable (or re-parameterize) a filter
    fn enable_filter(&mut self, name: &str, params: FilterParams);

    /// Disable a filter
    fn disable_filter(&mut self, name: &str);

    /// Parameters of an enabled filter, `None` if disabled
    fn filter_params(&self, name: &str) -> Option<&FilterParams>;

    /// Whether a filter is enabled
    fn filter_enabled(&self, name: &str) -> bool {
        self.filter_params(name).is_some()
    }
}

impl VisibilityFilters for FilterState {
    fn enable_filter(&mut self, name: &str, params: FilterParams) {
        self.enable(name, params);
    }

    fn disable_filter(&mut self, name: &str) {
        self.disable(name);
    }

    fn filter_params(&self, name: &str) -> Option<&FilterParams> {
        self.params(name)
    }
}

/// Scoped suspension of named filters
///
/// Derefs to the wrapped target so work can proceed through the guard.
///
/// # Example
///
/// ```
/// use formgate_storage::{FilterGuard, FilterState, VisibilityFilters, SOFT_DELETE_FILTER};
///
/// let mut filters = FilterState::new();
/// filters.enable_filter(SOFT_DELETE_FILTER, Default::default());
/// {
///     let guard = FilterGuard::suspend(&mut filters, &[SOFT_DELETE_FILTER]);
///     assert!(!guard.filter_enabled(SOFT_DELETE_FILTER));
/// }
/// assert!(filters.filter_enabled(SOFT_DELETE_FILTER));
/// ```
pub struct FilterGuard<'a, T: VisibilityFilters + ?Sized> {
    target: &'a mut T,
    saved: Vec<(String, Option<FilterParams>)>,
}

impl<'a, T: VisibilityFilters + ?Sized> FilterGuard<'a, T> {
    /// Disable `names` on `target` until the guard is dropped
    pub fn suspend(target: &'a mut T, names: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(names.len());
        for name in names {
            saved.push((name.to_string(), target.filter_params(name).cloned()));
            target.disable_filter(name);
        }
        trace!(target: "formgate::reconcile", filters = ?names, "Filters suspended");
        Self { target, saved }
    }
}

impl<T: VisibilityFilters + ?Sized> Deref for FilterGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: VisibilityFilters + ?Sized> DerefMut for FilterGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: VisibilityFilters + ?Sized> Drop for FilterGuard<'_, T> {
    fn drop(&mut self) {
        // reverse order so a name listed twice ends in its original state
        while let Some((name, prior)) = self.saved.pop() {
            match prior {
                Some(params) => self.target.enable_filter(&name, params),
                None => self.target.disable_filter(&name),
            }
        }
        trace!(target: "formgate::reconcile", "Filters restored");
    }
}
