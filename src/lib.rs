//! # api-manager
//!
//! 带缓存与请求去重的异步 HTTP 客户端：内容协商、超时处理、TTL 响应缓存。
//!
//! A caching, request-deduplicating async HTTP client for a single logical
//! backend origin: content negotiation, per-caller timeouts, and TTL-based
//! response caching behind a pluggable storage port.
//!
//! ## Overview
//!
//! Every request runs one fixed pipeline: normalize identity → cache read →
//! in-flight coordinator → fetch → decode → cache write-back. The identity is
//! the (absolute URL, method) pair; concurrent calls for the same identity
//! share one network call, and cache-eligible responses are served from the
//! store until their TTL elapses.
//!
//! This is deliberately not a full HTTP library: no retries with backoff, no
//! redirect policy, no streaming bodies. It optimizes for avoiding duplicate
//! in-flight requests and redundant network calls for recently fetched,
//! cache-eligible resources.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use api_manager::{ApiClient, CacheOptions, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> api_manager::Result<()> {
//!     let client = ApiClient::builder("https://api.example.com", "v1").build()?;
//!
//!     // Cached for the default TTL; a concurrent identical call shares
//!     // this one's network round trip.
//!     let feed = client
//!         .get("/feed", RequestOptions::new(), CacheOptions::enabled())
//!         .await?;
//!     println!("{feed:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client façade, builder, per-call options |
//! | [`cache`] | Versioned TTL cache store and storage backends |
//! | [`content`] | Content negotiation: types, encoding, decoding |
//! | [`identity`] | Request identity (the cache/dedup key) |
//! | [`error`] | Unified error taxonomy |
//!
//! HTTP-level error statuses are not errors here: a 4xx/5xx response is
//! decoded and returned like any other body, for the caller to interpret.

pub mod cache;
pub mod client;
pub mod content;
pub mod error;
pub mod identity;

mod coordinator;
mod transport;

// Re-export main types for convenience
pub use cache::{CacheBackend, CacheStats, CacheStatus, CacheStore, MemoryBackend, NullBackend};
pub use client::{ApiClient, ApiClientBuilder, CacheOptions, RequestOptions};
pub use content::{ContentType, RequestBody, ResponseBody};
pub use error::{Error, Result};
pub use identity::RequestIdentity;
