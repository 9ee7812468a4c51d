//! Key-value storage for short-lived single-use secrets.
//!
//! The in-memory implementation below is the one deployed today; it keeps
//! its state in process-local memory, which means anti-forgery tokens and
//! login challenges do not survive a restart and are not shared between
//! server instances. Multi-instance deployments need an implementation of
//! [`TokenCacheTrait`] backed by a shared external store; callers are
//! written against the trait so nothing else has to change.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[async_trait]
pub trait TokenCacheTrait: Send + Sync {
    /// Stores a value under `key` for `ttl`. An existing entry under the
    /// same key is replaced.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

    /// Removes and returns the value under `key` in one step. Returns
    /// `None` for a missing, expired, or already-taken key; the removal
    /// happens before the caller sees the value, so a key can be taken
    /// successfully at most once.
    async fn take(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Drops expired entries, returning how many were removed.
    async fn sweep(&self) -> anyhow::Result<usize>;
}

struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryTokenCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCacheTrait for MemoryTokenCache {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        let Some(entry) = entries.remove(key) else {
            return Ok(None);
        };
        if entry.expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn sweep(&self) -> anyhow::Result<usize> {
        let mut entries = self.entries.lock().expect("token cache poisoned");
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}
