//! Request coordinator: per-identity coalescing of in-flight requests.
//!
//! While a network call for a given identity is in flight, later callers for
//! the same identity receive the same pending result instead of issuing a
//! second call. At most one entry exists per identity; it is removed as soon
//! as the underlying work settles, success or failure.
//!
//! Timeouts are per-caller, not per-entry: a caller abandoning its wait does
//! not cancel the shared work for remaining subscribers. A detached driver
//! task polls every registered future to completion, so the work settles and
//! the entry is reaped even after all subscribers have walked away.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::trace;

use crate::content::ResponseBody;
use crate::identity::RequestIdentity;
use crate::{Error, Result};

/// Outcome shared by every coalesced caller. The error side is `Arc`-wrapped
/// because transport errors are not cloneable.
type SharedOutcome = std::result::Result<ResponseBody, Arc<Error>>;

/// A registered in-flight request.
pub(crate) type PendingFuture = Shared<BoxFuture<'static, SharedOutcome>>;

pub(crate) struct RequestCoordinator {
    pending: Arc<Mutex<HashMap<String, PendingFuture>>>,
}

impl RequestCoordinator {
    pub(crate) fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the pending future for `identity`, registering one from
    /// `factory` if none exists.
    ///
    /// Lookup and registration happen under one lock acquisition with no
    /// intervening await, so two near-simultaneous callers can never both
    /// observe "no pending entry" and both launch work. The entry removes
    /// itself once the work settles, on both outcomes.
    pub(crate) fn run_exclusive<F>(&self, identity: &RequestIdentity, factory: F) -> PendingFuture
    where
        F: FnOnce() -> BoxFuture<'static, Result<ResponseBody>>,
    {
        let key = identity.key();
        let mut pending = self.pending.lock().unwrap();

        if let Some(existing) = pending.get(&key) {
            trace!(identity = %identity, "joining in-flight request");
            return existing.clone();
        }

        let work = factory();
        let map = Arc::clone(&self.pending);
        let cleanup_key = key.clone();
        let shared = async move {
            let outcome = work.await.map_err(Arc::new);
            map.lock().unwrap().remove(&cleanup_key);
            outcome
        }
        .boxed()
        .shared();

        // Detached driver: subscribers may all abandon their waits, and an
        // unpolled Shared future would never settle, leaving the entry in
        // the map forever and handing a much-later caller a stale fetch.
        tokio::spawn(shared.clone().map(|_| ()));

        trace!(identity = %identity, "registered in-flight request");
        pending.insert(key, shared.clone());
        shared
    }

    /// Number of identities currently in flight.
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    fn identity(path: &str) -> RequestIdentity {
        let url = Url::parse(&format!("https://api.example.com{path}")).unwrap();
        RequestIdentity::new(url, Method::GET)
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let coordinator = RequestCoordinator::new();
        let id = identity("/feed");
        let launches = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let launches_a = launches.clone();
        let first = coordinator.run_exclusive(&id, move || {
            async move {
                launches_a.fetch_add(1, Ordering::SeqCst);
                rx.await.ok();
                Ok(ResponseBody::Text("shared".into()))
            }
            .boxed()
        });

        // Second caller arrives while the first is still in flight.
        let launches_b = launches.clone();
        let second = coordinator.run_exclusive(&id, move || {
            async move {
                launches_b.fetch_add(1, Ordering::SeqCst);
                Ok(ResponseBody::Text("never".into()))
            }
            .boxed()
        });

        assert_eq!(coordinator.pending_count(), 1);
        tx.send(()).unwrap();

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap(), ResponseBody::Text("shared".into()));
        assert_eq!(b.unwrap(), ResponseBody::Text("shared".into()));
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn different_identities_do_not_coalesce() {
        let coordinator = RequestCoordinator::new();
        let a = coordinator.run_exclusive(&identity("/a"), || {
            async { Ok(ResponseBody::Text("a".into())) }.boxed()
        });
        let b = coordinator.run_exclusive(&identity("/b"), || {
            async { Ok(ResponseBody::Text("b".into())) }.boxed()
        });

        assert_eq!(a.await.unwrap(), ResponseBody::Text("a".into()));
        assert_eq!(b.await.unwrap(), ResponseBody::Text("b".into()));
    }

    #[tokio::test]
    async fn abandoned_entry_is_reaped_once_the_work_settles() {
        let coordinator = RequestCoordinator::new();
        let id = identity("/abandoned");

        let pending = coordinator.run_exclusive(&id, || {
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(ResponseBody::Text("late".into()))
            }
            .boxed()
        });

        // The sole subscriber walks away without awaiting.
        drop(pending);
        assert_eq!(coordinator.pending_count(), 1);

        // The driver task settles the work and the entry is removed.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn failure_is_shared_and_does_not_wedge_the_identity() {
        let coordinator = RequestCoordinator::new();
        let id = identity("/flaky");

        let first = coordinator.run_exclusive(&id, || {
            async { Err(Error::RequestTimedOut) }.boxed()
        });
        let second = coordinator.run_exclusive(&id, || {
            async { Ok(ResponseBody::Text("never".into())) }.boxed()
        });

        let (a, b) = tokio::join!(first, second);
        assert!(a.unwrap_err().is_timeout());
        assert!(b.unwrap_err().is_timeout());

        // The identity is free again; a fresh call runs fresh work.
        assert_eq!(coordinator.pending_count(), 0);
        let third = coordinator.run_exclusive(&id, || {
            async { Ok(ResponseBody::Text("fresh".into())) }.boxed()
        });
        assert_eq!(third.await.unwrap(), ResponseBody::Text("fresh".into()));
    }
}
