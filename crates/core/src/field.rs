//! Field access by dotted path
//!
//! Sorting, filtering, and message templating need "the value at
//! `customer.address.city`" for arbitrary row types. Instead of runtime
//! reflection, every row type implements [`FieldLookup`] with an explicit
//! dispatch (usually a `match` on the first path segment).
//!
//! ```
//! use formgate_core::{FieldLookup, FieldPath, Value};
//!
//! struct Customer { name: String, city: String }
//!
//! impl FieldLookup for Customer {
//!     fn lookup(&self, path: &str) -> Option<Value> {
//!         match FieldPath::new(path).split_first() {
//!             ("name", None) => Some(Value::from(self.name.as_str())),
//!             ("address", Some("city")) => Some(Value::from(self.city.as_str())),
//!             _ => None,
//!         }
//!     }
//! }
//! ```

use crate::value::Value;
use std::collections::BTreeMap;

/// Compile-time field access by dotted path
pub trait FieldLookup {
    /// Value at `path`, or `None` if the path does not name a field
    fn lookup(&self, path: &str) -> Option<Value>;
}

/// A borrowed dotted path such as `"order.lines.0.sku"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath<'a>(&'a str);

impl<'a> FieldPath<'a> {
    /// Wrap a dotted path
    pub fn new(path: &'a str) -> Self {
        Self(path)
    }

    /// The path as written
    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// Split into the first segment and the remainder (if any)
    pub fn split_first(&self) -> (&'a str, Option<&'a str>) {
        match self.0.split_once('.') {
            Some((head, tail)) => (head, Some(tail)),
            None => (self.0, None),
        }
    }

    /// Iterate over segments
    pub fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.0.split('.')
    }
}

/// Walk nested `Map`/`List` values by dotted path
///
/// An exact key match wins over descent, so flat keys such as
/// `"order.number"` and nested maps can coexist.
pub fn lookup_in_map(map: &BTreeMap<String, Value>, path: &str) -> Option<Value> {
    if let Some(v) = map.get(path) {
        return Some(v.clone());
    }
    let (head, tail) = FieldPath::new(path).split_first();
    let tail = tail?;
    descend(map.get(head)?, tail)
}

fn descend(value: &Value, path: &str) -> Option<Value> {
    match value {
        Value::Map(entries) => lookup_in_map(entries, path),
        Value::List(items) => {
            let (head, tail) = FieldPath::new(path).split_first();
            let item = items.get(head.parse::<usize>().ok()?)?;
            match tail {
                Some(rest) => descend(item, rest),
                None => Some(item.clone()),
            }
        }
        _ => None,
    }
}

impl FieldLookup for BTreeMap<String, Value> {
    fn lookup(&self, path: &str) -> Option<Value> {
        lookup_in_map(self, path)
    }
}

/// Sort direction for [`sort_by_field`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest first (nulls first)
    #[default]
    Ascending,
    /// Largest first (nulls last)
    Descending,
}

/// Stable sort of `rows` by the value at `path`
///
/// Rows without the field sort as `Null`.
pub fn sort_by_field<T: FieldLookup>(rows: &mut [T], path: &str, direction: SortDirection) {
    rows.sort_by(|a, b| {
        let left = a.lookup(path).unwrap_or(Value::Null);
        let right = b.lookup(path).unwrap_or(Value::Null);
        let ord = left.sort_cmp(&right);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}
