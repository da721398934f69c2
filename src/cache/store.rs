//! Two-part cache store: blob namespace + metadata side-table.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

use super::backend::CacheBackend;
use crate::content::ResponseBody;
use crate::identity::RequestIdentity;
use crate::Result;

/// Per-entry metadata, kept separately from the blob payload so expiry can be
/// checked without deserializing the full response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheMeta {
    created_at: u64,
    expiry_date: u64,
}

/// Read-only freshness introspection for a single entry. Timestamps are epoch
/// milliseconds; `time_remaining_ms` may be negative for an entry that has
/// expired but not yet been evicted.
#[derive(Debug, Clone, Copy)]
pub struct CacheStatus {
    pub is_valid: bool,
    pub created_at: u64,
    pub expiry_date: u64,
    pub time_remaining_ms: i64,
}

/// Snapshot of store counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// TTL-based response cache, keyed by request identity and scoped by a
/// versioned namespace (`api-cache-<version>`).
///
/// Expired entries are evicted lazily on next access, never by a background
/// sweep. Every mutation touches blob and metadata together so the two parts
/// stay consistent from the caller's perspective.
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    stats: AtomicStats,
}

impl CacheStore {
    /// `version` is the cache schema version. A store built with a different
    /// version sees an empty namespace; entries written under another version
    /// are never read and never migrated.
    pub fn new(backend: Arc<dyn CacheBackend>, version: &str) -> Self {
        Self {
            backend,
            namespace: format!("api-cache-{version}"),
            stats: AtomicStats::default(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn blob_key(&self, identity: &RequestIdentity) -> String {
        format!("{}:data:{}", self.namespace, identity.key())
    }

    fn meta_key(&self, identity: &RequestIdentity) -> String {
        format!("{}:meta:{}", self.namespace, identity.key())
    }

    fn blob_prefix(&self) -> String {
        format!("{}:data:", self.namespace)
    }

    /// Returns the stored body, or `None` for a missing or expired entry.
    /// An expired entry is deleted as a side effect of the read.
    pub async fn read(&self, identity: &RequestIdentity) -> Result<Option<ResponseBody>> {
        let Some(meta) = self.read_meta(identity).await? else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        if epoch_millis() >= meta.expiry_date {
            trace!(identity = %identity, "cache entry expired, evicting");
            self.delete(identity).await?;
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let Some(blob) = self.backend.get(&self.blob_key(identity)).await? else {
            // Metadata without a blob is a torn state; drop the metadata so
            // the next read starts clean.
            warn!(identity = %identity, "cache metadata without blob, repairing");
            self.backend.delete(&self.meta_key(identity)).await?;
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        match serde_json::from_slice(&blob) {
            Ok(body) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                debug!(identity = %identity, "cache hit");
                Ok(Some(body))
            }
            Err(err) => {
                warn!(identity = %identity, %err, "cached blob failed to decode, evicting");
                self.delete(identity).await?;
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Stores `data` with `expiry_date = now + duration`, overwriting any
    /// prior entry for the same identity.
    pub async fn write(
        &self,
        identity: &RequestIdentity,
        data: &ResponseBody,
        duration: Duration,
    ) -> Result<()> {
        let now = epoch_millis();
        let meta = CacheMeta {
            created_at: now,
            expiry_date: now.saturating_add(duration.as_millis() as u64),
        };

        // Blob first, metadata last: a torn write leaves no metadata, which
        // reads as a plain miss.
        let blob = serde_json::to_vec(data)?;
        self.backend.put(&self.blob_key(identity), &blob).await?;
        self.backend
            .put(&self.meta_key(identity), &serde_json::to_vec(&meta)?)
            .await?;

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        debug!(identity = %identity, expiry = meta.expiry_date, "cache write");
        Ok(())
    }

    /// Removes both the blob entry and its metadata.
    pub async fn delete(&self, identity: &RequestIdentity) -> Result<()> {
        // Metadata first so a torn delete cannot leave metadata pointing at
        // a missing blob being reported as a hit.
        self.backend.delete(&self.meta_key(identity)).await?;
        self.backend.delete(&self.blob_key(identity)).await?;
        Ok(())
    }

    /// Removes every entry under this store's namespace.
    pub async fn clear_all(&self) -> Result<()> {
        self.backend.clear(&format!("{}:", self.namespace)).await?;
        debug!(namespace = %self.namespace, "cache namespace cleared");
        Ok(())
    }

    /// Read-only introspection; never mutates or evicts.
    pub async fn status(&self, identity: &RequestIdentity) -> Result<Option<CacheStatus>> {
        let Some(meta) = self.read_meta(identity).await? else {
            return Ok(None);
        };
        let now = epoch_millis();
        Ok(Some(CacheStatus {
            is_valid: now < meta.expiry_date,
            created_at: meta.created_at,
            expiry_date: meta.expiry_date,
            time_remaining_ms: meta.expiry_date as i64 - now as i64,
        }))
    }

    /// Number of entries currently held under this namespace, expired or not.
    pub async fn len(&self) -> Result<usize> {
        self.backend.len(&self.blob_prefix()).await
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn read_meta(&self, identity: &RequestIdentity) -> Result<Option<CacheMeta>> {
        let Some(raw) = self.backend.get(&self.meta_key(identity)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&raw) {
            Ok(meta) => Ok(Some(meta)),
            Err(err) => {
                warn!(identity = %identity, %err, "cache metadata failed to decode, evicting");
                self.delete(identity).await?;
                Ok(None)
            }
        }
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
