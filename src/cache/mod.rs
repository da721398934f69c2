//! 响应缓存模块：按 (URL, 方法) 键存储已解码的响应体，支持 TTL 过期。
//!
//! # Response Caching Module
//!
//! TTL-based response caching behind a pluggable storage port. The store is
//! two-part: a blob namespace holding serialized decoded response bodies, and
//! a metadata side-table holding per-key creation and expiry timestamps so
//! freshness can be checked without deserializing the blob.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | Versioned, two-part store with lazy expiry-on-read |
//! | [`CacheBackend`] | Trait for pluggable persistent key-value backends |
//! | [`MemoryBackend`] | In-memory backend (default) |
//! | [`NullBackend`] | No-op backend for disabling persistence |
//! | [`CacheStatus`] | Read-only freshness introspection for one entry |
//! | [`CacheStats`] | Hit/miss/write/eviction counters |
//!
//! ## Namespace versioning
//!
//! Every store is scoped by `api-cache-<version>`. A client built with a new
//! schema version starts from an empty namespace; no migration of entries
//! written under another version is ever attempted.

mod backend;
mod store;

pub use backend::{CacheBackend, MemoryBackend, NullBackend};
pub use store::{CacheStats, CacheStatus, CacheStore};
