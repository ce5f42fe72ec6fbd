//! Version vectors for optimistic concurrency
//!
//! A `VersionVector` is the ordered list of opaque version tokens of every
//! row participating in one logical edit, captured when the edit form was
//! rendered and compared against the store when the edit is submitted.
//!
//! ## Invariants
//!
//! - Order is significant: `["a","b"]` is not the same as `["b","a"]`
//! - Length is significant: `["a"]` is not the same as `["a","b"]`
//! - A zero-length vector is valid and equals another zero-length vector
//! - An absent row is represented by [`VersionVector::ABSENT`], never by
//!   omission, so positions stay aligned

use crate::error::{FormgateError, FormgateResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered sequence of opaque version tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionVector(Vec<String>);

impl VersionVector {
    /// Sentinel token for a participating row that does not exist
    pub const ABSENT: &'static str = "\u{2205}";

    /// Create an empty vector
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a vector from tokens in participation order
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Capture a vector from optional per-row versions
    ///
    /// `None` entries become [`VersionVector::ABSENT`].
    pub fn capture<'a, I>(versions: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        Self(
            versions
                .into_iter()
                .map(|v| v.unwrap_or(Self::ABSENT).to_string())
                .collect(),
        )
    }

    /// Append one token
    pub fn push(&mut self, token: impl Into<String>) {
        self.0.push(token.into());
    }

    /// Append the absent sentinel
    pub fn push_absent(&mut self) {
        self.0.push(Self::ABSENT.to_string());
    }

    /// Number of participating rows
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no rows participate
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokens in order
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Same length and pairwise-equal in order
    pub fn same_as(&self, other: &VersionVector) -> bool {
        self.0.len() == other.0.len() && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }
}

/// Compare two vectors that may be missing
///
/// A missing vector is a programming-contract violation, not a mismatch:
/// callers must capture a vector (possibly empty) for every edit.
pub fn same_as(a: Option<&VersionVector>, b: Option<&VersionVector>) -> FormgateResult<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Ok(a.same_as(b)),
        (None, _) => Err(FormgateError::contract(
            "left version vector is missing; capture an empty vector instead",
        )),
        (_, None) => Err(FormgateError::contract(
            "right version vector is missing; capture an empty vector instead",
        )),
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}
