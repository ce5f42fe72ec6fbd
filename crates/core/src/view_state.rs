//! View-state: the attributes a page renders from
//!
//! View-state is what survives exactly one redirect hop inside a
//! `RedirectContextSnapshot`. Keys are ordered so snapshots encode
//! deterministically.

use crate::field::{lookup_in_map, FieldLookup};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from attribute key to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState(BTreeMap<String, Value>);

impl ViewState {
    /// Create an empty view-state
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Get an attribute
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set an attribute, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove an attribute
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether the attribute is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate attributes in key order
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Merge inherited attributes underneath the current ones
    ///
    /// Keys already present in `self` win; only missing keys are taken from
    /// `inherited`. Returns the number of keys taken.
    pub fn merge_inherited(&mut self, inherited: ViewState) -> usize {
        let mut taken = 0;
        for (key, value) in inherited.0 {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.0.entry(key) {
                slot.insert(value);
                taken += 1;
            }
        }
        taken
    }

    /// Overwrite attributes with every entry of `updates`
    pub fn apply(&mut self, updates: ViewState) {
        self.0.extend(updates.0);
    }
}

impl FieldLookup for ViewState {
    fn lookup(&self, path: &str) -> Option<Value> {
        lookup_in_map(&self.0, path)
    }
}

impl FromIterator<(String, Value)> for ViewState {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, Value>> for ViewState {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
