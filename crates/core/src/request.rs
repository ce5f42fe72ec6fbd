//! Request-scoped context
//!
//! Everything a component needs to know about "the current request" is
//! carried in a [`RequestContext`] passed down the call chain. There is no
//! ambient thread-local state: log correlation, login identity, and locale
//! all travel as arguments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Session identifier supplied by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a transport-supplied session identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one incoming request
///
/// A RequestId is a wrapper around a UUID v4 and exists only for log
/// correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random RequestId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RequestId from a string representation
    ///
    /// # Errors
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticated principal and its authorities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginIdentity {
    /// Login user identifier
    pub user_id: String,
    /// Granted roles / authorities
    pub authorities: BTreeSet<String>,
}

impl LoginIdentity {
    /// Identity with no authorities
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            authorities: BTreeSet::new(),
        }
    }

    /// Grant an authority
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    /// Whether the identity holds `authority`
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}

/// Explicit request-scoped context threaded through every call
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id for logs
    pub request_id: RequestId,
    /// Session this request belongs to
    pub session_id: SessionId,
    /// Logged-in identity, if any
    pub login: Option<LoginIdentity>,
    /// Preferred locale tag (e.g. `"en-US"`)
    pub locale: Option<String>,
    /// Client timezone offset from UTC in minutes
    pub timezone_offset_minutes: i32,
}

impl RequestContext {
    /// Anonymous context for `session_id` with a fresh request id
    pub fn new(session_id: SessionId) -> Self {
        Self {
            request_id: RequestId::new(),
            session_id,
            login: None,
            locale: None,
            timezone_offset_minutes: 0,
        }
    }

    /// Attach a login identity
    pub fn with_login(mut self, login: LoginIdentity) -> Self {
        self.login = Some(login);
        self
    }

    /// Attach a locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Attach a timezone offset
    pub fn with_timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset_minutes = minutes;
        self
    }

    /// Whether a user is logged in
    pub fn is_logged_in(&self) -> bool {
        self.login.is_some()
    }
}
