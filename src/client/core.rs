use futures::FutureExt;
use reqwest::Method;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheStats, CacheStatus, CacheStore};
use crate::client::builder::ApiClientBuilder;
use crate::client::options::{CacheOptions, RequestOptions};
use crate::content::{self, ContentType, RequestBody, ResponseBody};
use crate::coordinator::RequestCoordinator;
use crate::identity::RequestIdentity;
use crate::transport::FetchExecutor;
use crate::{Error, Result};

/// HTTP API client for a single logical backend origin.
///
/// Every call runs the same fixed pipeline: normalize identity → cache read →
/// in-flight coordinator → fetch → decode → cache write-back. Identity is the
/// (absolute URL, method) pair only; per-call timeouts never participate.
pub struct ApiClient {
    pub(crate) base_url: Url,
    pub(crate) store: Arc<CacheStore>,
    pub(crate) coordinator: RequestCoordinator,
    pub(crate) executor: Arc<FetchExecutor>,
    pub(crate) default_timeout: Duration,
    pub(crate) default_cache_ttl: Duration,
}

impl ApiClient {
    /// Create a builder. `cache_version` scopes the persistent cache
    /// namespace (`api-cache-<version>`).
    pub fn builder(
        base_url: impl Into<String>,
        cache_version: impl Into<String>,
    ) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url, cache_version)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get(
        &self,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        self.request(Method::GET, path, options, cache).await
    }

    pub async fn post(
        &self,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        self.request(Method::POST, path, options, cache).await
    }

    pub async fn put(
        &self,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        self.request(Method::PUT, path, options, cache).await
    }

    pub async fn patch(
        &self,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        self.request(Method::PATCH, path, options, cache).await
    }

    pub async fn delete(
        &self,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        self.request(Method::DELETE, path, options, cache).await
    }

    /// Upload a regular file as a multipart body.
    ///
    /// Rejects with [`Error::InvalidUpload`] before any network activity when
    /// the path does not name a readable regular file.
    pub async fn upload_file(
        &self,
        path: &str,
        file: impl AsRef<Path>,
        mut options: RequestOptions,
    ) -> Result<ResponseBody> {
        let file = file.as_ref();
        let metadata = tokio::fs::metadata(file)
            .await
            .map_err(|err| Error::InvalidUpload(format!("{}: {err}", file.display())))?;
        if !metadata.is_file() {
            return Err(Error::InvalidUpload(format!(
                "{}: not a regular file",
                file.display()
            )));
        }

        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|err| Error::InvalidUpload(format!("{}: {err}", file.display())))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        options.content = Some(ContentType::Multipart);
        options.body = Some(RequestBody::Multipart(form));

        self.request(Method::POST, path, options, CacheOptions::disabled())
            .await
    }

    /// Remove every entry under this client's cache namespace.
    pub async fn clear_cache(&self) -> Result<()> {
        self.store.clear_all().await
    }

    /// Remove the cached entry for one (path, method) pair.
    pub async fn clear_cache_entry(&self, path: &str, method: Method) -> Result<()> {
        let identity = self.identity(method, path)?;
        self.store.delete(&identity).await
    }

    /// Number of entries currently cached, expired-but-unevicted included.
    pub async fn cache_size(&self) -> Result<usize> {
        self.store.len().await
    }

    /// Freshness of one cached entry, without mutating or evicting it.
    pub async fn cache_status(&self, path: &str, method: Method) -> Result<Option<CacheStatus>> {
        let identity = self.identity(method, path)?;
        self.store.status(&identity).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.store.stats()
    }

    fn identity(&self, method: Method, path: &str) -> Result<RequestIdentity> {
        let url = self.base_url.join(path)?;
        Ok(RequestIdentity::new(url, method))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        cache: CacheOptions,
    ) -> Result<ResponseBody> {
        let identity = self.identity(method, path)?;
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        if cache.allow {
            match self.store.read(&identity).await {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(err) => {
                    warn!(identity = %identity, %err, "cache read failed, treating as miss");
                }
            }
        }

        let multipart = options
            .body
            .as_ref()
            .map(RequestBody::is_multipart)
            .unwrap_or(false);
        let headers = content::build_headers(options.content, &options.headers, multipart);
        let encoded = content::encode_body(options.body, options.content)?;

        let write_back = cache
            .allow
            .then(|| cache.duration.unwrap_or(self.default_cache_ttl));
        let executor = Arc::clone(&self.executor);
        let store = Arc::clone(&self.store);
        let fetch_identity = identity.clone();

        let shared = self.coordinator.run_exclusive(&identity, move || {
            async move {
                let response = executor.execute(&fetch_identity, encoded, headers).await?;
                let body = content::decode_response(response).await?;
                if let Some(duration) = write_back {
                    if let Err(err) = store.write(&fetch_identity, &body, duration).await {
                        warn!(
                            identity = %fetch_identity,
                            %err,
                            "cache write-back failed, skipping"
                        );
                    }
                }
                Ok(body)
            }
            .boxed()
        });

        // The timeout is this caller's alone. Abandoning the wait leaves the
        // shared fetch running for any remaining subscribers.
        match tokio::time::timeout(timeout, shared).await {
            Ok(outcome) => outcome.map_err(Error::from),
            Err(_) => {
                debug!(identity = %identity, ?timeout, "caller timeout elapsed");
                Err(Error::RequestTimedOut)
            }
        }
    }
}
