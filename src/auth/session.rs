// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process web sessions.
//!
//! A session is created by the form login and referenced by the `SESSION`
//! cookie. It carries the same `{subject, role}` shape as a token so the access
//! policy does not care which chain produced the identity. Sessions expire
//! after a period of inactivity; each successful lookup extends them.

use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{Identity, Role};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "SESSION";

#[derive(Debug, Clone)]
struct Session {
    subject: String,
    role: Role,
    last_seen: Instant,
}

/// Concurrent session store keyed by opaque session id.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Start a session for `identity` and return its id.
    pub fn create(&self, identity: &Identity) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                subject: identity.subject.clone(),
                role: identity.role,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Resolve a session id into an identity, refreshing its idle timer.
    pub fn get(&self, id: &str) -> Option<Identity> {
        self.get_at(id, Instant::now())
    }

    pub fn get_at(&self, id: &str, now: Instant) -> Option<Identity> {
        let mut entry = self.sessions.get_mut(id)?;
        if now.saturating_duration_since(entry.last_seen) >= self.ttl {
            drop(entry);
            self.sessions.remove(id);
            return None;
        }
        entry.last_seen = now;

        let ttl_secs = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        Some(Identity::new(
            entry.subject.clone(),
            entry.role,
            Utc::now().timestamp().saturating_add(ttl_secs),
        ))
    }

    /// End a session. Unknown ids are ignored.
    pub fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// End every session belonging to `subject` (account deleted).
    pub fn remove_subject(&self, subject: &str) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.subject != subject);
        before.saturating_sub(self.sessions.len())
    }

    /// Drop sessions idle for at least the TTL. Returns how many were removed.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.saturating_duration_since(session.last_seen) < self.ttl);
        before.saturating_sub(self.sessions.len())
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

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[test]
    fn created_session_resolves_to_identity() {
        let store = store();
        let id = store.create(&Identity::new("Ann@Example.com", Role::Admin, 0));

        let identity = store.get(&id).unwrap();
        assert_eq!(identity.subject, "ann@example.com");
        assert_eq!(identity.role, Role::Admin);
    }

    #[test]
    fn unknown_or_removed_session_is_none() {
        let store = store();
        assert!(store.get("missing").is_none());

        let id = store.create(&Identity::new("a@x.io", Role::User, 0));
        store.remove(&id);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn idle_session_expires_and_access_extends_it() {
        let store = store();
        let id = store.create(&Identity::new("a@x.io", Role::User, 0));
        let start = Instant::now();

        assert!(store.get_at(&id, start + Duration::from_secs(50)).is_some());
        // Last access at +50s, so +100s is still within the idle window.
        assert!(store.get_at(&id, start + Duration::from_secs(100)).is_some());
        assert!(store.get_at(&id, start + Duration::from_secs(200)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_idle_sessions() {
        let store = store();
        let start = Instant::now();
        let stale = store.create(&Identity::new("a@x.io", Role::User, 0));
        let fresh = store.create(&Identity::new("b@x.io", Role::User, 0));
        store.get_at(&fresh, start + Duration::from_secs(90));

        let removed = store.sweep_expired_at(start + Duration::from_secs(120));
        assert_eq!(removed, 1);
        assert!(store.get_at(&stale, start + Duration::from_secs(120)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_subject_ends_all_of_a_users_sessions() {
        let store = store();
        store.create(&Identity::new("a@x.io", Role::User, 0));
        store.create(&Identity::new("a@x.io", Role::User, 0));
        store.create(&Identity::new("b@x.io", Role::User, 0));

        assert_eq!(store.remove_subject("a@x.io"), 2);
        assert_eq!(store.len(), 1);
    }
}
