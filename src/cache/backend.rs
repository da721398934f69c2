//! Cache backend implementations.
//!
//! The backend is a plain byte-oriented key-value port. Freshness is not its
//! concern: expiry lives in the store's metadata side-table, so a backend
//! never needs to understand what it is holding.

use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Storage port for the cache store.
///
/// `clear` and `len` are prefix-scoped because several stores (one per cache
/// schema version) may share one backend; clearing a namespace must not
/// disturb entries written under another version.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn clear(&self, prefix: &str) -> Result<()>;
    async fn len(&self, prefix: &str) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// In-memory backend. The default when no other backend is injected.
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().unwrap().remove(key).is_some())
    }

    async fn clear(&self, prefix: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn len(&self, prefix: &str) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .count())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// No-op backend: every read misses, every write is dropped.
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullBackend {
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn put(&self, _: &str, _: &[u8]) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _: &str) -> Result<bool> {
        Ok(false)
    }

    async fn clear(&self, _: &str) -> Result<()> {
        Ok(())
    }

    async fn len(&self, _: &str) -> Result<usize> {
        Ok(0)
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_round_trip() {
        let backend = MemoryBackend::new();
        backend.put("ns:a", b"one").await.unwrap();
        assert_eq!(backend.get("ns:a").await.unwrap(), Some(b"one".to_vec()));
        assert!(backend.delete("ns:a").await.unwrap());
        assert_eq!(backend.get("ns:a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_backend_clear_is_prefix_scoped() {
        let backend = MemoryBackend::new();
        backend.put("v1:a", b"1").await.unwrap();
        backend.put("v1:b", b"2").await.unwrap();
        backend.put("v2:a", b"3").await.unwrap();

        backend.clear("v1:").await.unwrap();

        assert_eq!(backend.len("v1:").await.unwrap(), 0);
        assert_eq!(backend.len("v2:").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn null_backend_drops_everything() {
        let backend = NullBackend::new();
        backend.put("k", b"v").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert_eq!(backend.len("").await.unwrap(), 0);
    }
}
