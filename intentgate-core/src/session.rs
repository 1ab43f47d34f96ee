//! Session → active intent bindings.
//!
//! Stores map a normalized session id to the intent the session has selected.
//! Bindings only change through explicit set/clear calls and live as long as
//! the store does.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Key used when a request carries no session id.
pub const GLOBAL_SESSION: &str = "global";

/// Trim a session id, mapping empty or absent ids to [`GLOBAL_SESSION`].
pub fn normalize_session_id(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => GLOBAL_SESSION.to_string(),
    }
}

/// Trait for session binding implementations.
///
/// Implementations must be safe to call from concurrent request flows.
pub trait SessionStore: Send + Sync {
    /// Bind `intent_id` to the session, replacing any previous binding.
    ///
    /// No check against the manifest happens here.
    fn set_active_intent(&self, session_id: Option<&str>, intent_id: &str);

    /// The intent bound to the session, if any.
    fn get_active_intent(&self, session_id: Option<&str>) -> Option<String>;

    /// Remove the session's binding.
    ///
    /// Returns `true` if a binding was removed.
    fn clear_active_intent(&self, session_id: Option<&str>) -> bool;
}

/// In-memory session store.
///
/// Bindings are lost when the process exits.
#[derive(Default)]
pub struct MemorySessionStore {
    bindings: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a binding.
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn set_active_intent(&self, session_id: Option<&str>, intent_id: &str) {
        let key = normalize_session_id(session_id);
        tracing::debug!(session = %key, intent = intent_id, "binding active intent");
        self.bindings.write().insert(key, intent_id.to_string());
    }

    fn get_active_intent(&self, session_id: Option<&str>) -> Option<String> {
        self.bindings
            .read()
            .get(&normalize_session_id(session_id))
            .cloned()
    }

    fn clear_active_intent(&self, session_id: Option<&str>) -> bool {
        self.bindings
            .write()
            .remove(&normalize_session_id(session_id))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_session_id(None), "global");
        assert_eq!(normalize_session_id(Some("")), "global");
        assert_eq!(normalize_session_id(Some("   ")), "global");
        assert_eq!(normalize_session_id(Some(" abc ")), "abc");
    }

    #[test]
    fn test_set_get_clear() {
        let store = MemorySessionStore::new();
        for session in [None, Some(""), Some("s1"), Some("  s2 ")] {
            store.set_active_intent(session, "I-1");
            assert_eq!(store.get_active_intent(session).as_deref(), Some("I-1"));

            assert!(store.clear_active_intent(session));
            assert_eq!(store.get_active_intent(session), None);
        }
    }

    #[test]
    fn test_absent_and_blank_share_global_binding() {
        let store = MemorySessionStore::new();
        store.set_active_intent(None, "I-1");
        assert_eq!(store.get_active_intent(Some(" ")).as_deref(), Some("I-1"));
        assert_eq!(store.get_active_intent(Some("global")).as_deref(), Some("I-1"));
    }

    #[test]
    fn test_overwrite_keeps_single_binding() {
        let store = MemorySessionStore::new();
        store.set_active_intent(Some("s"), "I-1");
        store.set_active_intent(Some("s"), "I-2");
        assert_eq!(store.get_active_intent(Some("s")).as_deref(), Some("I-2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_missing_is_noop() {
        let store = MemorySessionStore::new();
        assert!(!store.clear_active_intent(Some("nobody")));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let store = Arc::new(MemorySessionStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let session = format!("s{}", i);
                store.set_active_intent(Some(&session), &format!("I-{}", i));
                store.get_active_intent(Some(&session))
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(format!("I-{}", i)));
        }
        assert_eq!(store.len(), 32);
    }
}
