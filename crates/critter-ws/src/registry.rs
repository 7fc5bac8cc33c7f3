//! The live session set.
//!
//! One mutex guards the collection's structure. It is held only for the
//! push, the identity scan, or the clone; session I/O always happens on a
//! snapshot after the lock is released.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::session::{SessionId, WebSocketSession};

/// Ordered collection of live WebSocket sessions.
///
/// A session appears at most once and is present exactly between its
/// [`add`](Self::add) and its first [`remove`](Self::remove).
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<WebSocketSession>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session. Returns `false` if it was already present.
    pub fn add(&self, session: Arc<WebSocketSession>) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.iter().any(|s| Arc::ptr_eq(s, &session)) {
            return false;
        }
        sessions.push(session);
        true
    }

    /// Removes a session by identity. Returns `false` if it was absent.
    pub fn remove(&self, session: &WebSocketSession) -> bool {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|s| !std::ptr::eq(Arc::as_ptr(s), session));
        before != sessions.len()
    }

    /// Returns a point-in-time copy of the live sessions.
    pub fn snapshot(&self) -> Vec<Arc<WebSocketSession>> {
        self.sessions.lock().clone()
    }

    /// Looks up a live session by ID.
    pub fn get(&self, id: SessionId) -> Option<Arc<WebSocketSession>> {
        self.sessions.lock().iter().find(|s| s.id() == id).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Returns true if no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Adds `session` and arranges for it to be removed when it closes.
    ///
    /// The close hook holds only a weak reference to the registry.
    pub fn track(self: &Arc<Self>, session: &Arc<WebSocketSession>) {
        if !self.add(Arc::clone(session)) {
            return;
        }
        debug!(session_id = %session.id(), path = session.path(), "session registered");

        let registry: Weak<Self> = Arc::downgrade(self);
        session.on_close(move |closed| {
            if let Some(registry) = registry.upgrade() {
                if registry.remove(closed) {
                    debug!(session_id = %closed.id(), "session unregistered");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::detached_session;
    use proptest::prelude::*;

    fn session() -> Arc<WebSocketSession> {
        Arc::new(detached_session("/ws"))
    }

    #[test]
    fn test_add_remove() {
        let registry = SessionRegistry::new();
        let a = session();
        let b = session();

        assert!(registry.add(Arc::clone(&a)));
        assert!(registry.add(Arc::clone(&b)));
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(&a));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(b.id()).is_some());
        assert!(registry.get(a.id()).is_none());
    }

    #[test]
    fn test_add_is_at_most_once() {
        let registry = SessionRegistry::new();
        let a = session();
        assert!(registry.add(Arc::clone(&a)));
        assert!(!registry.add(Arc::clone(&a)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = SessionRegistry::new();
        let a = session();
        assert!(!registry.remove(&a));
        registry.add(Arc::clone(&a));
        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let registry = SessionRegistry::new();
        let a = session();
        registry.add(Arc::clone(&a));

        let snapshot = registry.snapshot();
        registry.add(session());
        registry.remove(&a);

        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_track_removes_on_close() {
        let registry = Arc::new(SessionRegistry::new());
        let a = session();
        registry.track(&a);
        registry.track(&a);
        assert_eq!(registry.len(), 1);

        a.mark_closed();
        assert!(registry.is_empty());
        a.mark_closed();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_track_after_close_never_leaks() {
        let registry = Arc::new(SessionRegistry::new());
        let a = session();
        a.mark_closed();
        registry.track(&a);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_track_and_close() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let sessions: Vec<_> = (0..50).map(|_| session()).collect();
                    for s in &sessions {
                        registry.track(s);
                    }
                    for s in &sessions {
                        s.mark_closed();
                        s.mark_closed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.is_empty());
    }

    proptest! {
        #[test]
        fn prop_len_matches_open_sessions(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let registry = Arc::new(SessionRegistry::new());
            let mut open: Vec<Arc<WebSocketSession>> = Vec::new();
            for add in ops {
                if add || open.is_empty() {
                    let s = session();
                    registry.track(&s);
                    open.push(s);
                } else if let Some(s) = open.pop() {
                    s.mark_closed();
                }
                prop_assert_eq!(registry.len(), open.len());
            }
        }
    }
}
