//! Row identity used during soft-delete reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant / group scope a row belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantScope(String);

impl TenantScope {
    /// Create a scope from its group identifier
    pub fn new(group: impl Into<String>) -> Self {
        Self(group.into())
    }

    /// The group identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// (primary key, natural key, tenant scope) of a row
///
/// Never persisted by this subsystem; only compared while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowIdentity {
    /// Primary-key value
    pub primary_key: String,
    /// Natural / unique key value, if the row type declares one
    pub natural_key: Option<String>,
    /// Scope the row belongs to
    pub scope: TenantScope,
}

impl RowIdentity {
    /// Identity without a natural key
    pub fn new(primary_key: impl Into<String>, scope: TenantScope) -> Self {
        Self {
            primary_key: primary_key.into(),
            natural_key: None,
            scope,
        }
    }

    /// Attach a natural key
    pub fn with_natural_key(mut self, natural_key: impl Into<String>) -> Self {
        self.natural_key = Some(natural_key.into());
        self
    }
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.primary_key, self.scope)?;
        if let Some(nk) = &self.natural_key {
            write!(f, " ({})", nk)?;
        }
        Ok(())
    }
}
