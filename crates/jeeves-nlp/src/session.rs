//! Per-session resolver handles.
//!
//! Each conversation gets its own `ReferenceResolver` behind a mutex; callers
//! lock the handle for the duration of one message so `update`/`resolve`
//! never interleave within a session. Sessions share nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::reference::{ReferenceResolver, DEFAULT_STALE_MINUTES};

pub type SessionHandle = Arc<Mutex<ReferenceResolver>>;

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<String, SessionHandle>,
    stale_minutes: i64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_stale_minutes(DEFAULT_STALE_MINUTES)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose sessions go stale after `stale_minutes` idle minutes
    /// (usually `JeevesConfig::stale_minutes`).
    pub fn with_stale_minutes(stale_minutes: i64) -> Self {
        Self {
            sessions: HashMap::new(),
            stale_minutes,
        }
    }

    pub fn stale_minutes(&self) -> i64 {
        self.stale_minutes
    }

    /// Handle for `session_id`, created on first use.
    pub fn session(&mut self, session_id: &str) -> SessionHandle {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "starting resolver session");
                Arc::new(Mutex::new(ReferenceResolver::new()))
            })
            .clone()
    }

    /// Handle for an existing session only.
    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).cloned()
    }

    /// Drop a session's state. Returns whether it existed.
    pub fn end(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Remove sessions idle past the registry's threshold.
    pub fn sweep_stale(&mut self) -> usize {
        self.sweep_older_than(self.stale_minutes)
    }

    /// Remove sessions idle for more than `threshold_minutes`. A poisoned
    /// session counts as stale. Returns the number removed.
    pub fn sweep_older_than(&mut self, threshold_minutes: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, handle| {
            handle
                .lock()
                .map(|r| !r.is_stale(threshold_minutes))
                .unwrap_or(false)
        });
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::info!(removed, "swept stale resolver sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::UpdateFields;

    #[test]
    fn sessions_are_isolated() {
        let mut reg = SessionRegistry::new();
        let a = reg.session("signal:alice");
        let b = reg.session("signal:bob");

        a.lock().unwrap().update(&UpdateFields {
            resolved_path: Some("app.ts".into()),
            ..Default::default()
        });

        assert_eq!(a.lock().unwrap().resolve("fix it").resolved, "fix app.ts");
        assert_eq!(b.lock().unwrap().resolve("fix it").resolved, "fix it");
    }

    #[test]
    fn same_id_returns_same_handle() {
        let mut reg = SessionRegistry::new();
        let first = reg.session("s1");
        let second = reg.session("s1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn end_drops_state() {
        let mut reg = SessionRegistry::new();
        reg.session("s1").lock().unwrap().update(&UpdateFields {
            error: Some("timeout".into()),
            ..Default::default()
        });
        assert!(reg.end("s1"));
        assert!(!reg.end("s1"));
        assert!(reg.get("s1").is_none());
        let fresh = reg.session("s1");
        assert!(fresh.lock().unwrap().state().error.is_none());
    }

    #[test]
    fn sweep_keeps_fresh_sessions() {
        let mut reg = SessionRegistry::new();
        assert_eq!(reg.stale_minutes(), DEFAULT_STALE_MINUTES);
        reg.session("s1");
        reg.session("s2");
        assert_eq!(reg.sweep_stale(), 0);
        assert_eq!(reg.sweep_older_than(30), 0);
        // negative threshold: everything is older than "the future"
        assert_eq!(reg.sweep_older_than(-1), 2);
        assert!(reg.is_empty());
    }

    #[test]
    fn sweep_uses_configured_threshold() {
        let mut reg = SessionRegistry::with_stale_minutes(-1);
        reg.session("s1");
        assert_eq!(reg.sweep_stale(), 1);

        let mut lenient = SessionRegistry::with_stale_minutes(45);
        lenient.session("s1");
        assert_eq!(lenient.sweep_stale(), 0);
        assert_eq!(lenient.len(), 1);
    }

    #[test]
    fn concurrent_messages_serialize_per_session() {
        let mut reg = SessionRegistry::new();
        let handle = reg.session("s1");
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let h = Arc::clone(&handle);
                std::thread::spawn(move || {
                    let mut r = h.lock().unwrap();
                    r.update(&UpdateFields {
                        resolved_path: Some(format!("file{i}.rs")),
                        ..Default::default()
                    });
                    let res = r.resolve("open it");
                    assert_eq!(res.resolved, format!("open file{i}.rs"));
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
    }
}
