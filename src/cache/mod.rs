//! In-memory session cache.
//!
//! Holds fully reconstructed sessions keyed by (project, session), bounded
//! by entry count with LRU eviction and a per-entry TTL. A parallel keyspace
//! holds resolved subagents. One `SessionCache` is constructed at startup
//! and shared by reference; the interior `RwLock`s serialize every
//! operation, so an invalidation never races a population of the same key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::reconstruct::{ResolvedSubagent, SessionDetail};

/// Default maximum number of cached sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 50;

/// Default time-to-live for a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_accessed: Instant,
}

/// One bounded LRU + TTL keyspace.
struct Store<K, V> {
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Store<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn get(&mut self, key: &K, ttl: Duration) -> Option<V> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() > ttl);
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        Some(entry.value.clone())
    }

    fn set(&mut self, key: K, value: V, max_entries: usize) {
        if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        let now = Instant::now();
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_accessed: now,
            },
        );
    }

    fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.entries.retain(|k, _| keep(k));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Shared cache for reconstructed sessions and resolved subagents.
pub struct SessionCache {
    sessions: RwLock<Store<(String, String), SessionDetail>>,
    subagents: RwLock<Store<(String, String, String), ResolvedSubagent>>,
    max_entries: usize,
    ttl: Duration,
}

impl SessionCache {
    /// Create a cache bounded to `max_entries` per keyspace with the given
    /// per-entry TTL.
    #[must_use]
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(Store::new()),
            subagents: RwLock::new(Store::new()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Fetch a cached session, refreshing its LRU position.
    ///
    /// Returns `None` on miss, after TTL expiry, or after invalidation.
    #[must_use]
    pub fn get(&self, project_id: &str, session_id: &str) -> Option<SessionDetail> {
        let mut sessions = self.sessions.write().ok()?;
        let key = (project_id.to_string(), session_id.to_string());
        let hit = sessions.get(&key, self.ttl);
        tracing::debug!(project_id, session_id, hit = hit.is_some(), "Session cache lookup");
        hit
    }

    /// Store a reconstructed session, replacing any previous value.
    pub fn set(&self, project_id: &str, session_id: &str, value: SessionDetail) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.set(
                (project_id.to_string(), session_id.to_string()),
                value,
                self.max_entries,
            );
        }
    }

    /// Drop one session and its resolved subagents.
    pub fn invalidate(&self, project_id: &str, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|(p, s)| !(p == project_id && s == session_id));
        }
        if let Ok(mut subagents) = self.subagents.write() {
            subagents.retain(|(p, s, _)| !(p == project_id && s == session_id));
        }
    }

    /// Drop everything cached for a project.
    pub fn invalidate_project(&self, project_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|(p, _)| p != project_id);
        }
        if let Ok(mut subagents) = self.subagents.write() {
            subagents.retain(|(p, _, _)| p != project_id);
        }
    }

    /// Fetch a cached resolved subagent.
    #[must_use]
    pub fn get_subagent(
        &self,
        project_id: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Option<ResolvedSubagent> {
        let mut subagents = self.subagents.write().ok()?;
        subagents.get(
            &(
                project_id.to_string(),
                session_id.to_string(),
                agent_id.to_string(),
            ),
            self.ttl,
        )
    }

    /// Store a resolved subagent.
    pub fn set_subagent(
        &self,
        project_id: &str,
        session_id: &str,
        agent_id: &str,
        value: ResolvedSubagent,
    ) {
        if let Ok(mut subagents) = self.subagents.write() {
            subagents.set(
                (
                    project_id.to_string(),
                    session_id.to_string(),
                    agent_id.to_string(),
                ),
                value,
                self.max_entries,
            );
        }
    }

    /// Number of cached sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the session keyspace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SESSIONS, DEFAULT_TTL)
    }
}
