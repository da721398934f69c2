//! Per-call request and cache options.

use std::collections::HashMap;
use std::time::Duration;

use crate::content::{ContentType, RequestBody};

/// Default per-caller timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(9_500);

/// Default TTL for cache-eligible responses (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Options recognized by every request-issuing call. The HTTP verb is fixed
/// by which façade method is called; everything else comes from here.
///
/// The per-call timeout belongs to the caller alone: it is excluded from the
/// request identity and never cancels a fetch shared with other callers.
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Explicit header overlay; wins over the symbolic content-type default.
    pub headers: HashMap<String, String>,
    /// Symbolic content-type name for the outgoing body.
    pub content: Option<ContentType>,
    pub body: Option<RequestBody>,
    /// Per-caller timeout. Falls back to the client default (9500 ms).
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn content(mut self, content: ContentType) -> Self {
        self.content = Some(content);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Shorthand for a JSON-encoded structured body.
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.content = Some(ContentType::Json);
        self.body = Some(RequestBody::Json(value));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Per-call caching configuration. Caching is opt-in; `duration` falls back
/// to the client's default TTL.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    pub allow: bool,
    pub duration: Option<Duration>,
}

impl CacheOptions {
    /// Caching disabled (the default).
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Caching enabled with the client's default TTL.
    pub fn enabled() -> Self {
        Self {
            allow: true,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
