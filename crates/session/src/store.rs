//! Session store abstraction
//!
//! The session store is owned by the transport layer; this subsystem only
//! reads and writes opaque blobs in it. Expiry is the store's business.

use dashmap::DashMap;
use formgate_core::{FormgateResult, SessionId};
use rustc_hash::FxHashMap;

/// Per-session blob storage
///
/// Thread safety: all methods may be called concurrently. Atomicity of a
/// read-modify-write sequence is provided by [`crate::Session::lock`], not by
/// the store.
pub trait SessionStore: Send + Sync {
    /// Read the blob stored under `key` for `session`
    fn get(&self, session: &SessionId, key: &str) -> FormgateResult<Option<Vec<u8>>>;

    /// Write the blob stored under `key` for `session`
    fn set(&self, session: &SessionId, key: &str, blob: Vec<u8>) -> FormgateResult<()>;

    /// Remove and return the blob stored under `key` for `session`
    fn remove(&self, session: &SessionId, key: &str) -> FormgateResult<Option<Vec<u8>>>;

    /// Drop every blob of `session` (expiry / logout)
    fn destroy(&self, session: &SessionId) -> FormgateResult<()>;
}

/// In-memory session store
///
/// Sessions are sharded by DashMap, so different sessions never contend.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, FxHashMap<String, Vec<u8>>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether `session` has any state
    pub fn contains(&self, session: &SessionId) -> bool {
        self.sessions.contains_key(session)
    }

    /// Keys stored for `session`, sorted
    pub fn keys(&self, session: &SessionId) -> Vec<String> {
        let mut keys: Vec<String> = self
            .sessions
            .get(session)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session: &SessionId, key: &str) -> FormgateResult<Option<Vec<u8>>> {
        Ok(self
            .sessions
            .get(session)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn set(&self, session: &SessionId, key: &str, blob: Vec<u8>) -> FormgateResult<()> {
        self.sessions
            .entry(session.clone())
            .or_default()
            .insert(key.to_string(), blob);
        Ok(())
    }

    fn remove(&self, session: &SessionId, key: &str) -> FormgateResult<Option<Vec<u8>>> {
        Ok(self
            .sessions
            .get_mut(session)
            .and_then(|mut entries| entries.remove(key)))
    }

    fn destroy(&self, session: &SessionId) -> FormgateResult<()> {
        self.sessions.remove(session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let store = MemorySessionStore::new();
        let s = SessionId::new("s1");

        assert_eq!(store.get(&s, "k").unwrap(), None);
        store.set(&s, "k", vec![1, 2, 3]).unwrap();
        assert_eq!(store.get(&s, "k").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.remove(&s, "k").unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get(&s, "k").unwrap(), None);
        assert_eq!(store.remove(&s, "k").unwrap(), None);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = MemorySessionStore::new();
        let a = SessionId::new("a");
        let b = SessionId::new("b");
        store.set(&a, "k", vec![1]).unwrap();
        assert_eq!(store.get(&b, "k").unwrap(), None);
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_destroy_drops_all_keys() {
        let store = MemorySessionStore::new();
        let s = SessionId::new("s");
        store.set(&s, "x", vec![1]).unwrap();
        store.set(&s, "y", vec![2]).unwrap();
        assert_eq!(store.keys(&s), vec!["x".to_string(), "y".to_string()]);

        store.destroy(&s).unwrap();
        assert!(!store.contains(&s));
        assert_eq!(store.get(&s, "x").unwrap(), None);
    }
}
