//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{DEFAULT_MAX_SESSIONS, DEFAULT_TTL};
use crate::journal::default_projects_root;
use crate::triggers::{default_rules, TriggerRuleConfig};
use crate::watcher::DEFAULT_DEBOUNCE;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub logs: LogsSettings,
    pub cache: CacheSettings,
    pub watcher: WatcherSettings,
    /// Ordered trigger rules for the error scanner.
    pub triggers: Vec<TriggerRuleConfig>,
}

impl Default for LensConfig {
    fn default() -> Self {
        Self {
            logs: LogsSettings::default(),
            cache: CacheSettings::default(),
            watcher: WatcherSettings::default(),
            triggers: default_rules(),
        }
    }
}

impl LensConfig {
    /// The projects root to read from: the configured override, or
    /// `~/.claude/projects`.
    #[must_use]
    pub fn projects_root(&self) -> Option<PathBuf> {
        self.logs
            .projects_root
            .clone()
            .or_else(default_projects_root)
    }
}

/// Log location settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogsSettings {
    /// Override for the projects root directory.
    pub projects_root: Option<PathBuf>,
}

/// Cache sizing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached sessions before LRU eviction.
    pub max_sessions: usize,
    /// Per-entry time-to-live in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Per-path debounce window in milliseconds.
    pub debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(100),
        }
    }
}

impl WatcherSettings {
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
