use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cache::{CacheBackend, CacheStore, MemoryBackend};
use crate::client::core::ApiClient;
use crate::client::options::{DEFAULT_CACHE_TTL, DEFAULT_TIMEOUT};
use crate::coordinator::RequestCoordinator;
use crate::transport::FetchExecutor;
use crate::Result;

/// How long an in-flight fetch may run before the transport aborts it. This
/// bounds fetches whose subscribers have all abandoned their waits.
const DEFAULT_TRANSPORT_DEADLINE: Duration = Duration::from_secs(60);

/// Builder for [`ApiClient`].
///
/// The base URL and the cache schema version are required up front: the
/// version scopes the persistent namespace, and a rebuilt client bumps it to
/// invalidate every prior entry rather than reuse a stale cache shape.
pub struct ApiClientBuilder {
    base_url: String,
    cache_version: String,
    backend: Option<Arc<dyn CacheBackend>>,
    default_timeout: Option<Duration>,
    default_cache_ttl: Option<Duration>,
    transport_deadline: Duration,
}

impl ApiClientBuilder {
    pub fn new(base_url: impl Into<String>, cache_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            cache_version: cache_version.into(),
            backend: None,
            default_timeout: None,
            default_cache_ttl: None,
            transport_deadline: DEFAULT_TRANSPORT_DEADLINE,
        }
    }

    /// Inject a storage backend. Default is an in-memory backend.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Default per-caller timeout. Also overridable via
    /// `API_MANAGER_TIMEOUT_MS`.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Default TTL for cache-eligible responses. Also overridable via
    /// `API_MANAGER_CACHE_TTL_MS`.
    pub fn default_cache_ttl(mut self, ttl: Duration) -> Self {
        self.default_cache_ttl = Some(ttl);
        self
    }

    /// Ceiling on how long any single fetch may run, regardless of caller
    /// timeouts.
    pub fn transport_deadline(mut self, deadline: Duration) -> Self {
        self.transport_deadline = deadline;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let base_url = Url::parse(&self.base_url)?;

        let default_timeout = self
            .default_timeout
            .or_else(|| env_duration_ms("API_MANAGER_TIMEOUT_MS"))
            .unwrap_or(DEFAULT_TIMEOUT);
        let default_cache_ttl = self
            .default_cache_ttl
            .or_else(|| env_duration_ms("API_MANAGER_CACHE_TTL_MS"))
            .unwrap_or(DEFAULT_CACHE_TTL);

        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let store = Arc::new(CacheStore::new(backend, &self.cache_version));
        let executor = Arc::new(FetchExecutor::new(self.transport_deadline)?);

        Ok(ApiClient {
            base_url,
            store,
            coordinator: RequestCoordinator::new(),
            executor,
            default_timeout,
            default_cache_ttl,
        })
    }
}

fn env_duration_ms(var: &str) -> Option<Duration> {
    env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
