//! Redirect contexts (state across exactly one redirect hop)
//!
//! Before a redirect, the orchestrator saves the current view-state and
//! pending messages under a fresh context id and puts that id on the
//! redirect URL. The request the browser performs against the redirect
//! target restores (and thereby deletes) the snapshot.
//!
//! A missing id is normal: bookmarks, reloads, and reused URLs all carry ids
//! that are no longer stored. Restore returns `None` for them and the page
//! starts fresh.

use crate::session::Session;
use chrono::{DateTime, Utc};
use formgate_core::{FormgateError, FormgateResult, Messages, ViewState};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Session key of the context map
pub const CONTEXTS_KEY: &str = "formgate.redirectContexts";

/// Default number of unconsumed snapshots kept per session
pub const DEFAULT_MAX_CONTEXTS_PER_SESSION: usize = 16;

/// Identifier of a saved snapshot, carried as a query parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(String);

impl ContextId {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identifier taken from a request parameter
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// View-state and pending messages saved for the next request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectContextSnapshot {
    /// Attributes to inherit
    #[serde(default)]
    pub view_state: ViewState,
    /// Messages to show on the next render
    #[serde(default)]
    pub pending_messages: Messages,
    /// When the snapshot was saved
    pub saved_at: DateTime<Utc>,
}

/// Snapshots keyed by context id, with insertion order for eviction
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContextMap {
    entries: HashMap<String, RedirectContextSnapshot>,
    order: VecDeque<String>,
}

/// Saves and restores redirect contexts
#[derive(Debug, Clone)]
pub struct RedirectContextStore {
    max_per_session: usize,
}

impl Default for RedirectContextStore {
    fn default() -> Self {
        Self {
            max_per_session: DEFAULT_MAX_CONTEXTS_PER_SESSION,
        }
    }
}

impl RedirectContextStore {
    /// Create a store keeping at most `max_per_session` unconsumed snapshots
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_per_session` is zero.
    pub fn new(max_per_session: usize) -> FormgateResult<Self> {
        if max_per_session == 0 {
            return Err(FormgateError::config(
                "contexts.max_per_session must be at least 1",
            ));
        }
        Ok(Self { max_per_session })
    }

    /// Save a snapshot under a fresh id
    ///
    /// When the session already holds the maximum number of unconsumed
    /// snapshots, the oldest is dropped.
    pub fn save(
        &self,
        session: &Session,
        view_state: &ViewState,
        pending_messages: &Messages,
    ) -> FormgateResult<ContextId> {
        let guard = session.lock();
        let mut map: ContextMap = guard.load(CONTEXTS_KEY)?.unwrap_or_default();

        let id = loop {
            let candidate = ContextId::generate();
            if !map.entries.contains_key(candidate.as_str()) {
                break candidate;
            }
        };
        map.entries.insert(
            id.as_str().to_string(),
            RedirectContextSnapshot {
                view_state: view_state.clone(),
                pending_messages: pending_messages.clone(),
                saved_at: Utc::now(),
            },
        );
        map.order.push_back(id.as_str().to_string());
        while map.order.len() > self.max_per_session {
            if let Some(oldest) = map.order.pop_front() {
                map.entries.remove(&oldest);
            }
        }
        guard.save(CONTEXTS_KEY, &map)?;

        debug!(
            target: "formgate::context",
            session_id = %guard.id(),
            context_id = %id,
            attributes = view_state.len(),
            messages = pending_messages.len(),
            "Redirect context saved"
        );
        Ok(id)
    }

    /// Remove and return the snapshot saved under `id`
    ///
    /// Returns `None` if the id was never stored, was evicted, or has already
    /// been restored.
    pub fn restore(
        &self,
        session: &Session,
        id: &ContextId,
    ) -> FormgateResult<Option<RedirectContextSnapshot>> {
        let guard = session.lock();
        let Some(mut map) = guard.load::<ContextMap>(CONTEXTS_KEY)? else {
            debug!(target: "formgate::context", session_id = %guard.id(), context_id = %id, "No redirect contexts in session");
            return Ok(None);
        };

        let snapshot = map.entries.remove(id.as_str());
        if snapshot.is_some() {
            map.order.retain(|k| k != id.as_str());
            guard.save(CONTEXTS_KEY, &map)?;
        }

        debug!(
            target: "formgate::context",
            session_id = %guard.id(),
            context_id = %id,
            found = snapshot.is_some(),
            "Redirect context restore"
        );
        Ok(snapshot)
    }

    /// Number of unconsumed snapshots in the session
    pub fn pending(&self, session: &Session) -> FormgateResult<usize> {
        let guard = session.lock();
        Ok(guard
            .load::<ContextMap>(CONTEXTS_KEY)?
            .map(|m| m.entries.len())
            .unwrap_or(0))
    }
}
