//! Table schemas and stored rows

use formgate_core::field::lookup_in_map;
use formgate_core::{FieldLookup, FieldPath, RowIdentity, TenantScope, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a row type declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Rows are flagged deleted instead of removed
    pub soft_delete: bool,
    /// Rows belong to a tenant scope and are filtered by it
    pub tenant_scoped: bool,
    /// Field holding the natural / unique key, if distinct from the primary key
    pub natural_key: Option<String>,
}

impl TableSchema {
    /// Plain table: no soft delete, no tenant scope, no natural key
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soft_delete: false,
            tenant_scoped: false,
            natural_key: None,
        }
    }

    /// Declare a soft-delete flag
    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    /// Declare tenant scoping
    pub fn tenant_scoped(mut self) -> Self {
        self.tenant_scoped = true;
        self
    }

    /// Declare a natural key field
    pub fn natural_key(mut self, field: impl Into<String>) -> Self {
        self.natural_key = Some(field.into());
        self
    }
}

/// A row as the store holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    /// Table the row belongs to
    pub table: String,
    /// Primary key, natural key, and scope
    pub identity: RowIdentity,
    /// Opaque version token assigned by the store on every write
    pub version: String,
    /// Soft-delete flag
    pub deleted: bool,
    /// Column values
    pub fields: BTreeMap<String, Value>,
}

impl StoredRow {
    /// A new, not-yet-written row
    pub fn new(table: impl Into<String>, identity: RowIdentity) -> Self {
        Self {
            table: table.into(),
            identity,
            version: String::new(),
            deleted: false,
            fields: BTreeMap::new(),
        }
    }

    /// Set a column value
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Primary key
    pub fn primary_key(&self) -> &str {
        &self.identity.primary_key
    }

    /// Scope
    pub fn scope(&self) -> &TenantScope {
        &self.identity.scope
    }

    /// `table#primary_key`, used in messages and errors
    pub fn entity_ref(&self) -> String {
        format!("{}#{}", self.table, self.identity.primary_key)
    }
}

impl FieldLookup for StoredRow {
    fn lookup(&self, path: &str) -> Option<Value> {
        match FieldPath::new(path).split_first() {
            ("primaryKey", None) => Some(Value::from(self.identity.primary_key.as_str())),
            ("naturalKey", None) => Some(Value::from(self.identity.natural_key.clone())),
            ("scope", None) => Some(Value::from(self.identity.scope.as_str())),
            ("version", None) => Some(Value::from(self.version.as_str())),
            ("deleted", None) => Some(Value::Bool(self.deleted)),
            ("fields", Some(rest)) => lookup_in_map(&self.fields, rest),
            _ => lookup_in_map(&self.fields, path),
        }
    }
}
