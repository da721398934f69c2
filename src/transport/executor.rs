use reqwest::header::HeaderMap;
use std::env;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::content::EncodedBody;
use crate::identity::RequestIdentity;
use crate::{Error, Result};

/// Performs the actual network call.
///
/// The transport deadline is a per-identity ceiling on the whole exchange; it
/// bounds fetches whose subscribers have all abandoned their waits. A non-2xx
/// status is not a failure at this layer: transport success and application
/// success are distinct concerns, and error responses are decoded like any
/// other body.
pub(crate) struct FetchExecutor {
    client: reqwest::Client,
}

impl FetchExecutor {
    pub(crate) fn new(transport_deadline: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(transport_deadline)
            .pool_max_idle_per_host(
                env::var("API_MANAGER_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(Error::RequestFailed)?;

        Ok(Self { client })
    }

    pub(crate) async fn execute(
        &self,
        identity: &RequestIdentity,
        body: EncodedBody,
        headers: HeaderMap,
    ) -> Result<reqwest::Response> {
        let request_id = Uuid::new_v4();

        let mut request = self
            .client
            .request(identity.method().clone(), identity.url().clone())
            .headers(headers)
            .header("x-request-id", request_id.to_string());

        request = match body {
            EncodedBody::Empty => request,
            EncodedBody::Text(text) => request.body(text),
            EncodedBody::Bytes(bytes) => request.body(bytes),
            EncodedBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await.map_err(Error::from_transport)?;
        debug!(
            identity = %identity,
            %request_id,
            status = %response.status(),
            "response received"
        );
        Ok(response)
    }
}
