//! Session handles and the per-session lock
//!
//! A [`Session`] pairs a session id with the shared store and the session's
//! mutex. All session-scoped components go through [`Session::lock`] so that
//! one mutual-exclusion boundary covers the token set, the context map, and
//! the ambient attributes together.

use crate::codec;
use crate::store::SessionStore;
use dashmap::DashMap;
use formgate_core::{FormgateResult, LoginIdentity, RequestContext, SessionId};
use parking_lot::{Mutex, MutexGuard};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Session key of the ambient request attributes
pub const ATTRIBUTES_KEY: &str = "formgate.attributes";

/// Ambient request-scoped data kept in the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAttributes {
    /// Preferred locale tag
    #[serde(default)]
    pub locale: Option<String>,
    /// Client timezone offset from UTC in minutes
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    /// Logged-in identity
    #[serde(default)]
    pub login: Option<LoginIdentity>,
}

type LockTable = DashMap<SessionId, Weak<SessionLock>>;

/// One session's mutex; its registry entry goes away with the last handle
struct SessionLock {
    id: SessionId,
    mutex: Mutex<()>,
    table: Weak<LockTable>,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            // a newer lock may already occupy the slot
            table.remove_if(&self.id, |_, lock| lock.strong_count() == 0);
        }
    }
}

/// Hands out [`Session`] handles that share one lock per session id
///
/// The registry only holds weak references: a lock lives exactly as long as
/// some handle for its session does, so sessions that simply expire leave
/// nothing behind.
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    locks: Arc<LockTable>,
}

impl SessionRegistry {
    /// Create a registry over `store`
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Handle for `id`, sharing the lock of every other live handle for `id`
    pub fn open(&self, id: &SessionId) -> Session {
        let mut slot = self.locks.entry(id.clone()).or_insert_with(Weak::new);
        let lock = match slot.upgrade() {
            Some(lock) => lock,
            None => {
                let lock = Arc::new(SessionLock {
                    id: id.clone(),
                    mutex: Mutex::new(()),
                    table: Arc::downgrade(&self.locks),
                });
                *slot = Arc::downgrade(&lock);
                lock
            }
        };
        drop(slot);
        Session {
            id: id.clone(),
            store: Arc::clone(&self.store),
            lock,
        }
    }

    /// Destroy the session's state (logout / expiry)
    ///
    /// Handles still in flight keep the same lock, so a request that opens
    /// the session afterwards serializes with them.
    pub fn invalidate(&self, id: &SessionId) -> FormgateResult<()> {
        self.open(id).invalidate()
    }

    /// Number of sessions with at least one live handle
    pub fn open_sessions(&self) -> usize {
        self.locks
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .count()
    }
}

/// Handle to one session
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    store: Arc<dyn SessionStore>,
    lock: Arc<SessionLock>,
}

impl Session {
    /// The session id
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Enter the session's critical section
    ///
    /// Blocks while another request of the same session holds the lock.
    pub fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            session: self,
            _guard: self.lock.mutex.lock(),
        }
    }

    /// Ambient attributes (defaults if never set)
    pub fn attributes(&self) -> FormgateResult<SessionAttributes> {
        Ok(self.lock().load(ATTRIBUTES_KEY)?.unwrap_or_default())
    }

    /// Replace the ambient attributes
    pub fn set_attributes(&self, attributes: &SessionAttributes) -> FormgateResult<()> {
        self.lock().save(ATTRIBUTES_KEY, attributes)
    }

    /// Fresh request context populated from the session attributes
    pub fn request_context(&self) -> FormgateResult<RequestContext> {
        let attributes = self.attributes()?;
        let mut ctx = RequestContext::new(self.id.clone())
            .with_timezone_offset(attributes.timezone_offset_minutes);
        ctx.locale = attributes.locale;
        ctx.login = attributes.login;
        Ok(ctx)
    }

    /// Drop all per-session state
    pub fn invalidate(&self) -> FormgateResult<()> {
        let _guard = self.lock.mutex.lock();
        self.store.destroy(&self.id)?;
        debug!(target: "formgate::session", session_id = %self.id, "Session invalidated");
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

/// Exclusive access to one session's blobs
pub struct SessionGuard<'a> {
    session: &'a Session,
    _guard: MutexGuard<'a, ()>,
}

impl SessionGuard<'_> {
    /// The session id
    pub fn id(&self) -> &SessionId {
        &self.session.id
    }

    /// Decode the blob under `key`, if present
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> FormgateResult<Option<T>> {
        match self.session.store.get(&self.session.id, key)? {
            Some(blob) => Ok(Some(codec::decode(&blob)?)),
            None => Ok(None),
        }
    }

    /// Encode `value` under `key`
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> FormgateResult<()> {
        let blob = codec::encode(value)?;
        self.session.store.set(&self.session.id, key, blob)
    }

    /// Remove the blob under `key`; returns whether it existed
    pub fn remove(&self, key: &str) -> FormgateResult<bool> {
        Ok(self.session.store.remove(&self.session.id, key)?.is_some())
    }
}
