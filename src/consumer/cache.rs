// src/consumer/cache.rs
//! Single-slot digest cache for the popup.
//!
//! The slot is replaced as a whole on every successful fetch and never evicted:
//! an old digest is still better than none.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::digest::Digest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Last fetched digest, verbatim.
    pub payload: Digest,
    pub fetched_at: DateTime<Utc>,
}

/// `now - fetchedAt < ttl`. Absolute TTL, no sliding refresh.
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age = now.signed_duration_since(entry.fetched_at);
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => age < ttl,
        // TTL beyond chrono's range: treat as "forever".
        Err(_) => true,
    }
}

#[async_trait]
pub trait DigestCache: Send + Sync {
    async fn get(&self) -> Option<CacheEntry>;
    async fn put(&self, entry: CacheEntry) -> Result<()>;
}

/// Mutex-guarded slot, lives as long as the consumer.
#[derive(Debug, Default)]
pub struct MemoryCache {
    slot: Mutex<Option<CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(entry: CacheEntry) -> Self {
        Self {
            slot: Mutex::new(Some(entry)),
        }
    }
}

#[async_trait]
impl DigestCache for MemoryCache {
    async fn get(&self) -> Option<CacheEntry> {
        self.slot.lock().expect("cache mutex poisoned").clone()
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        *self.slot.lock().expect("cache mutex poisoned") = Some(entry);
        Ok(())
    }
}

/// JSON file slot that survives restarts. Missing or corrupt file = empty slot.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DigestCache for FileCache {
    async fn get(&self) -> Option<CacheEntry> {
        let s = match tokio::fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(target: "consumer", path = %self.path.display(), error = %e, "cache unreadable");
                return None;
            }
        };
        match serde_json::from_str(&s) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(target: "consumer", path = %self.path.display(), error = %e, "cache corrupt, ignoring");
                None
            }
        }
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_vec(&entry).context("serializing cache entry")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
