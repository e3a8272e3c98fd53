// src/consumer/mod.rs
//! Popup-side loading: TTL cache first, network second, stale cache last.

pub mod cache;
pub mod source;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::digest::Digest;
use crate::error::ConsumerError;
use crate::metrics::ensure_metrics_described;

pub use cache::{is_fresh, CacheEntry, DigestCache, FileCache, MemoryCache};
pub use source::{DigestSource, HttpSource};

pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Which branch produced the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPath {
    /// Cache younger than the TTL; no network call.
    Cache,
    /// Freshly fetched and cached.
    Network,
    /// Fetch failed; expired cache served instead.
    Stale,
}

impl LoadPath {
    fn as_str(&self) -> &'static str {
        match self {
            LoadPath::Cache => "cache",
            LoadPath::Network => "network",
            LoadPath::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub digest: Digest,
    pub path: LoadPath,
}

pub struct Consumer {
    source: Arc<dyn DigestSource>,
    cache: Arc<dyn DigestCache>,
    ttl: Duration,
}

impl Consumer {
    pub fn new(source: Arc<dyn DigestSource>, cache: Arc<dyn DigestCache>, ttl: Duration) -> Self {
        Self { source, cache, ttl }
    }

    pub async fn load_digest(&self) -> Result<Digest, ConsumerError> {
        self.load_digest_at(Utc::now()).await
    }

    pub async fn load_digest_at(&self, now: DateTime<Utc>) -> Result<Digest, ConsumerError> {
        self.load_at(now).await.map(|l| l.digest)
    }

    /// Full load with the branch taken, for callers that want to log or display it.
    pub async fn load_at(&self, now: DateTime<Utc>) -> Result<Loaded, ConsumerError> {
        ensure_metrics_described();

        let cached = self.cache.get().await;
        if let Some(entry) = &cached {
            if is_fresh(entry, now, self.ttl) {
                debug!(target: "consumer", fetched_at = %entry.fetched_at, "using cached digest");
                return Ok(self.done(entry.payload.clone(), LoadPath::Cache));
            }
        }

        match self.source.fetch().await {
            Ok(digest) => {
                let entry = CacheEntry {
                    payload: digest.clone(),
                    fetched_at: now,
                };
                if let Err(e) = self.cache.put(entry).await {
                    warn!(target: "consumer", error = ?e, "cache write failed");
                }
                info!(target: "consumer", date = %digest.date, stories = digest.stories.len(), "digest fetched");
                Ok(self.done(digest, LoadPath::Network))
            }
            Err(e) => {
                counter!("consumer_fetch_errors_total").increment(1);
                // Re-read: another load may have refreshed the slot meanwhile.
                match self.cache.get().await.or(cached) {
                    Some(entry) => {
                        warn!(
                            target: "consumer",
                            error = %e,
                            fetched_at = %entry.fetched_at,
                            "fetch failed, serving expired cache"
                        );
                        Ok(self.done(entry.payload, LoadPath::Stale))
                    }
                    None => {
                        warn!(target: "consumer", error = %e, "fetch failed with empty cache");
                        Err(ConsumerError::Unavailable(e))
                    }
                }
            }
        }
    }

    fn done(&self, digest: Digest, path: LoadPath) -> Loaded {
        counter!("consumer_loads_total", "path" => path.as_str()).increment(1);
        Loaded { digest, path }
    }
}
