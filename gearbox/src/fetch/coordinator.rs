use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use shared::{Error, Result};
use shared::config::Config;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::domain::DataType;
use crate::ports::BlobStore;

type SharedFetch = Shared<BoxFuture<'static, Result<Bytes>>>;

enum InFlight {
    Ready(Bytes),
    Pending(SharedFetch),
}

/// Empties the in-flight slot when dropped, also when the fetch task panics.
struct ReleaseSlot(Arc<Mutex<Option<SharedFetch>>>);

impl Drop for ReleaseSlot {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

/// What a caller gets when the blob store fails to refresh an expired entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Return the last stored payload when there is one, the error otherwise.
    #[default]
    ServeStale,
    /// Always return the error.
    Propagate,
}

impl FailurePolicy {
    pub fn from_config(config: &Config) -> Self {
        if config.serve_stale_on_error {
            FailurePolicy::ServeStale
        } else {
            FailurePolicy::Propagate
        }
    }
}

/// Serves one [`DataType`] from the cache and refreshes it from the blob
/// store when it expires.
///
/// At most one blob fetch is in flight per fetcher. Callers arriving while
/// it runs wait on the same shared future and receive its result.
pub struct StaticDataFetcher {
    data_type: DataType,
    cache: Arc<TtlCache>,
    blob_store: Arc<dyn BlobStore>,
    failure_policy: FailurePolicy,
    // Cleared by the fetch itself, after the cache was updated
    in_flight: Arc<Mutex<Option<SharedFetch>>>,
}

impl StaticDataFetcher {
    pub fn new(data_type: DataType, cache: Arc<TtlCache>, blob_store: Arc<dyn BlobStore>) -> Self {
        Self {
            data_type,
            cache,
            blob_store,
            failure_policy: FailurePolicy::default(),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Cached payload when valid, otherwise the result of the single
    /// in-flight blob fetch (started here if none is running).
    pub async fn fetch(&self) -> Result<Bytes> {
        if let Some(payload) = self.cache.get_valid(self.data_type) {
            debug!("Cache hit for '{}'", self.data_type);
            return Ok(payload);
        }

        let pending = match self.join_or_start() {
            InFlight::Ready(payload) => return Ok(payload),
            InFlight::Pending(pending) => pending,
        };

        match pending.await {
            Ok(payload) => Ok(payload),
            Err(err) => self.recover(err),
        }
    }

    /// Drop the cached value so the next `fetch` goes to the blob store.
    pub fn invalidate(&self) -> bool {
        self.cache.remove(self.data_type)
    }

    /// Attach to the running fetch, or start one when the slot is idle.
    fn join_or_start(&self) -> InFlight {
        let mut slot = self.in_flight.lock();
        if let Some(pending) = slot.as_ref() {
            debug!("Waiting for in-flight fetch of '{}'", self.data_type);
            return InFlight::Pending(pending.clone());
        }

        // A fetch may have completed since the caller's cache check
        if let Some(payload) = self.cache.get_valid(self.data_type) {
            return InFlight::Ready(payload);
        }

        let pending = self.start_fetch();
        *slot = Some(pending.clone());
        InFlight::Pending(pending)
    }

    /// Runs the blob read on its own task so it completes even when every
    /// caller waiting on it goes away. Must be called with the slot locked.
    fn start_fetch(&self) -> SharedFetch {
        let data_type = self.data_type;
        let cache = Arc::clone(&self.cache);
        let blob_store = Arc::clone(&self.blob_store);
        let release = ReleaseSlot(Arc::clone(&self.in_flight));

        let task = tokio::spawn(async move {
            let resource = data_type.resource_name();
            let started = Instant::now();
            info!(
                "Fetching '{}' from blob '{}' ({})",
                data_type,
                resource,
                blob_store.name()
            );

            let result = blob_store.fetch(resource).await;
            match &result {
                Ok(payload) => {
                    cache.store(data_type, payload.clone(), true);
                    info!(
                        "Fetched '{}' ({} bytes) in {} ms",
                        data_type,
                        payload.len(),
                        started.elapsed().as_millis()
                    );
                }
                Err(err) => {
                    warn!("Fetch of '{}' failed: {}", data_type, err);
                }
            }

            // Slot is cleared only after the cache was updated
            drop(release);
            result
        });

        task.map(move |joined| {
            joined.unwrap_or_else(|err| {
                Err(Error::Internal(format!(
                    "fetch task for '{data_type}' failed: {err}"
                )))
            })
        })
        .boxed()
        .shared()
    }

    fn recover(&self, err: Error) -> Result<Bytes> {
        if self.failure_policy == FailurePolicy::ServeStale {
            if let Some(stale) = self.cache.get_stale(self.data_type) {
                warn!(
                    "Serving expired '{}' after failed refresh: {}",
                    self.data_type, err
                );
                return Ok(stale);
            }
        }
        Err(err)
    }
}

impl std::fmt::Debug for StaticDataFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDataFetcher")
            .field("data_type", &self.data_type)
            .field("blob_store", &self.blob_store.name())
            .field("failure_policy", &self.failure_policy)
            .field("fetching", &self.is_fetching())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedBlobStore;
    use super::*;
    use crate::domain::CacheDurations;
    use shared::Error;
    use std::time::Duration;
    use tokio::time::advance;

    fn setup(
        blob: ScriptedBlobStore,
        policy: FailurePolicy,
    ) -> (Arc<StaticDataFetcher>, Arc<TtlCache>, Arc<ScriptedBlobStore>) {
        let cache = Arc::new(TtlCache::new(CacheDurations::new(
            Duration::from_secs(10),
            Duration::from_secs(120),
        )));
        let blob = Arc::new(blob);
        let fetcher = StaticDataFetcher::new(DataType::Items, cache.clone(), blob.clone())
            .with_failure_policy(policy);
        (Arc::new(fetcher), cache, blob)
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_concurrent_fetches_share_one_blob_read() {
        let (fetcher, _cache, blob) = setup(
            ScriptedBlobStore::returning("[items]", Duration::from_millis(1000)),
            FailurePolicy::ServeStale,
        );

        let (first, second) = tokio::join!(fetcher.fetch(), fetcher.fetch());

        assert_eq!(first.unwrap(), Bytes::from("[items]"));
        assert_eq!(second.unwrap(), Bytes::from("[items]"));
        assert_eq!(blob.calls(), 1);
        assert!(!fetcher.is_fetching());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_concurrent_fetches_on_worker_threads() {
        let (fetcher, _cache, blob) = setup(
            ScriptedBlobStore::returning("[items]", Duration::from_millis(50)),
            FailurePolicy::ServeStale,
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let fetcher = fetcher.clone();
                tokio::spawn(async move { fetcher.fetch().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), Bytes::from("[items]"));
        }
        assert_eq!(blob.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_cache_skips_blob_store() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::returning("[from blob]", Duration::ZERO),
            FailurePolicy::ServeStale,
        );
        cache.store(DataType::Items, "[cached]", true);

        for _ in 0..3 {
            assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[cached]"));
        }
        assert_eq!(blob.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refreshed() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::returning("[v1]", Duration::ZERO),
            FailurePolicy::ServeStale,
        );

        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[v1]"));

        blob.respond("[v2]");
        advance(Duration::from_secs(5)).await;
        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[v1]"));
        assert_eq!(blob.calls(), 1);

        advance(Duration::from_secs(6)).await;
        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[v2]"));
        assert_eq!(blob.calls(), 2);
        assert!(cache.has_valid_cache(DataType::Items));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_shared_and_resets_to_idle() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::failing(Duration::from_millis(500)),
            FailurePolicy::Propagate,
        );

        let (first, second) = tokio::join!(fetcher.fetch(), fetcher.fetch());
        let expected = Error::blob_fetch("scripted", "storage unavailable");
        assert_eq!(first, Err(expected.clone()));
        assert_eq!(second, Err(expected));
        assert_eq!(blob.calls(), 1);
        assert!(!fetcher.is_fetching());
        assert!(!cache.has_valid_cache(DataType::Items));

        // Next call retries
        blob.respond("[items]");
        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[items]"));
        assert_eq!(blob.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_serves_stale_payload() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::returning("[v1]", Duration::ZERO),
            FailurePolicy::ServeStale,
        );
        fetcher.fetch().await.unwrap();

        blob.fail();
        advance(Duration::from_secs(11)).await;

        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[v1]"));
        // Still expired, so the next call goes back to the blob store
        assert!(!cache.has_valid_cache(DataType::Items));
        fetcher.fetch().await.unwrap();
        assert_eq!(blob.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_propagates_when_configured() {
        let (fetcher, _cache, blob) = setup(
            ScriptedBlobStore::returning("[v1]", Duration::ZERO),
            FailurePolicy::Propagate,
        );
        fetcher.fetch().await.unwrap();

        blob.fail();
        advance(Duration::from_secs(11)).await;

        assert!(matches!(fetcher.fetch().await, Err(Error::BlobFetch { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_without_stale_value_is_an_error() {
        let (fetcher, _cache, _blob) = setup(
            ScriptedBlobStore::failing(Duration::ZERO),
            FailurePolicy::ServeStale,
        );

        let result = fetcher.fetch().await;
        assert!(result.unwrap_err().is_blob_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_initiator_does_not_wedge_fetch() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::returning("[items]", Duration::from_millis(1000)),
            FailurePolicy::ServeStale,
        );

        let initiator = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fetcher.is_fetching());

        initiator.abort();
        assert!(initiator.await.unwrap_err().is_cancelled());

        // Nobody is waiting anymore, the blob read still completes
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!fetcher.is_fetching());
        assert!(cache.has_valid_cache(DataType::Items));

        assert_eq!(fetcher.fetch().await.unwrap(), Bytes::from("[items]"));
        assert_eq!(blob.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_completed_before_lock_is_not_repeated() {
        let (fetcher, cache, blob) = setup(
            ScriptedBlobStore::returning("[from blob]", Duration::ZERO),
            FailurePolicy::ServeStale,
        );

        // Caller missed the cache, then the running fetch stored before the slot was checked
        assert!(!cache.has_valid_cache(DataType::Items));
        cache.store(DataType::Items, "[stored meanwhile]", true);

        match fetcher.join_or_start() {
            InFlight::Ready(payload) => assert_eq!(payload, Bytes::from("[stored meanwhile]")),
            InFlight::Pending(_) => panic!("an idle slot with a valid cache must not start a fetch"),
        }
        assert!(!fetcher.is_fetching());
        assert_eq!(blob.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_or_start_attaches_to_running_fetch() {
        let (fetcher, _cache, blob) = setup(
            ScriptedBlobStore::returning("[items]", Duration::from_millis(1000)),
            FailurePolicy::ServeStale,
        );

        let first = match fetcher.join_or_start() {
            InFlight::Pending(pending) => pending,
            InFlight::Ready(_) => panic!("empty cache must start a fetch"),
        };
        let second = match fetcher.join_or_start() {
            InFlight::Pending(pending) => pending,
            InFlight::Ready(_) => panic!("fetch is still running"),
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), Bytes::from("[items]"));
        assert_eq!(second.unwrap(), Bytes::from("[items]"));
        assert_eq!(blob.calls(), 1);
        assert!(!fetcher.is_fetching());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let (fetcher, _cache, blob) = setup(
            ScriptedBlobStore::returning("[items]", Duration::ZERO),
            FailurePolicy::ServeStale,
        );
        fetcher.fetch().await.unwrap();

        assert!(fetcher.invalidate());
        fetcher.fetch().await.unwrap();
        assert_eq!(blob.calls(), 2);
    }
}
