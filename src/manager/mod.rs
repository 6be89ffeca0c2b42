//! Asset Manager
//!
//! Orchestrates cache lookup, fetch dispatch, decoding, pagination, fan-out
//! and identifier-keyed cancellation.

mod registry;
mod sequences;

use std::sync::{Arc, OnceLock};

use tokio::sync::{oneshot, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::cache::{
    Blob, CacheConfig, CacheStats, ExpiringCache, SharedCache, DEFAULT_CAPACITY,
};
use crate::config::Config;
use crate::cursor::{Cursor, Page};
use crate::delivery::{DeliverySink, InlineDelivery};
use crate::error::{log_failure, AssetError, BoxError, NetworkError, Result};
use crate::fetch::{Fetcher, HttpTransport};

pub use registry::TaskIdentifier;

use registry::TaskRegistry;
use sequences::SequenceCache;

/// Where a payload came from.
enum Source {
    Cache { generation: u64 },
    Network,
}

// == Asset Manager ==
/// Front door of the asset pipeline.
///
/// Cloning is cheap and every clone shares the same cache, fetcher, task
/// registry and retained sequences. Must be used from within a Tokio runtime.
#[derive(Clone)]
pub struct AssetManager {
    cache: SharedCache,
    fetcher: Fetcher,
    delivery: Arc<dyn DeliverySink>,
    tasks: Arc<Mutex<TaskRegistry>>,
    sequences: Arc<Mutex<SequenceCache>>,
}

impl AssetManager {
    // == Constructors ==
    /// Creates a manager over `cache`, fetching with `fetcher` and running
    /// callbacks inline.
    pub fn new(cache: SharedCache, fetcher: Fetcher) -> Self {
        Self {
            cache,
            fetcher,
            delivery: Arc::new(InlineDelivery),
            tasks: Arc::new(Mutex::new(TaskRegistry::default())),
            sequences: Arc::new(Mutex::new(SequenceCache::new(DEFAULT_CAPACITY))),
        }
    }

    /// Creates a manager with its own cache and an HTTP fetcher built from `config`.
    pub fn from_config(config: &Config) -> Self {
        let cache_config = CacheConfig::default()
            .with_capacity(config.cache_capacity)
            .with_ttl(config.ttl());
        let cache = ExpiringCache::new("assets", cache_config).shared();
        let fetcher = Fetcher::new(Arc::new(HttpTransport::new())).with_timeout(config.timeout());

        Self::new(cache, fetcher).with_retained_limit(config.cache_capacity)
    }

    /// Process-wide default manager over [`ExpiringCache::main`] and HTTP.
    pub fn global() -> &'static AssetManager {
        static GLOBAL: OnceLock<AssetManager> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            AssetManager::new(
                ExpiringCache::main(),
                Fetcher::new(Arc::new(HttpTransport::new())),
            )
        })
    }

    /// Routes callback results through `delivery`.
    pub fn with_delivery(mut self, delivery: Arc<dyn DeliverySink>) -> Self {
        self.delivery = delivery;
        self
    }

    /// Caps how many decoded sequences are retained for paging.
    pub fn with_retained_limit(mut self, limit: usize) -> Self {
        self.sequences = Arc::new(Mutex::new(SequenceCache::new(limit)));
        self
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    // == Request Bytes ==
    /// Returns the bytes behind `url`, from the cache when fresh.
    ///
    /// Fetched bytes are cached with the default TTL; failures are not cached.
    pub async fn request_bytes(&self, url: &str) -> Result<Blob> {
        let (bytes, source) = self.load(url).await?;
        if matches!(source, Source::Network) {
            self.store(url, bytes.clone()).await;
        }
        Ok(bytes)
    }

    // == Request Typed ==
    /// Returns the value `decode` produces from the bytes behind `url`.
    ///
    /// Bytes that fail to decode are never kept: a fetched payload is not
    /// cached and a cached one is evicted. Either way the decode error is
    /// returned without another fetch.
    pub async fn request_typed<T, D, E>(&self, url: &str, decode: D) -> Result<T>
    where
        D: FnOnce(&[u8]) -> std::result::Result<T, E>,
        E: Into<BoxError>,
    {
        let (bytes, source) = self.load(url).await?;
        let value = match decode(&bytes[..]) {
            Ok(value) => value,
            Err(err) => return Err(self.reject(url, &source, err).await),
        };
        if matches!(source, Source::Network) {
            self.store(url, bytes).await;
        }
        Ok(value)
    }

    // == Request Paged ==
    /// Returns the page of the decoded sequence behind `url` that `cursor` selects.
    ///
    /// While the retained sequence for `url` is current and covers the
    /// window, the page is cut from it directly. Otherwise the sequence is
    /// decoded again (from cached bytes or a fresh fetch), ordered by the
    /// cursor, retained and then sliced. [`Page::End`] means there is no
    /// more data.
    ///
    /// One sequence is retained per URL, in the order it was sorted into.
    /// A later cursor paging the same URL reuses that order even if its own
    /// ordering differs. Removing the URL from the cache forces a re-sort.
    pub async fn request_paged<T, D, E>(
        &self,
        url: &str,
        decode: D,
        cursor: &Cursor<T>,
    ) -> Result<Page<T>>
    where
        T: Clone + Send + Sync + 'static,
        D: FnOnce(&[u8]) -> std::result::Result<Vec<T>, E>,
        E: Into<BoxError>,
    {
        if let Some(items) = self.retained::<T>(url).await {
            if cursor.window_end() <= items.len() {
                debug!(url, window = ?cursor.range(), "paging from retained sequence");
                return Ok(cursor.slice(&items));
            }
        }

        let (bytes, source) = self.load(url).await?;
        let mut items = match decode(&bytes[..]) {
            Ok(items) => items,
            Err(err) => return Err(self.reject(url, &source, err).await),
        };
        cursor.sort(&mut items);

        let generation = match source {
            Source::Cache { generation } => generation,
            Source::Network => self.store(url, bytes).await,
        };
        let page = cursor.slice(&items);
        self.sequences
            .lock()
            .await
            .retain(url, generation, Arc::new(items));
        Ok(page)
    }

    // == Request Many ==
    /// Fetches every URL concurrently.
    ///
    /// `on_each` runs once per URL in completion order, success or failure.
    /// `on_all` runs once afterwards. Both go through the delivery sink.
    pub fn request_many<I, F, A>(&self, urls: I, on_each: F, on_all: A) -> JoinHandle<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: Fn(String, Result<Blob>) + Send + Sync + 'static,
        A: FnOnce() + Send + 'static,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        let on_each = Arc::new(on_each);
        let manager = self.clone();

        tokio::spawn(async move {
            let mut requests = JoinSet::new();
            for url in urls {
                let manager = manager.clone();
                let on_each = Arc::clone(&on_each);
                requests.spawn(async move {
                    let result = manager.request_bytes(&url).await;
                    manager
                        .delivery
                        .deliver(Box::new(move || on_each(url, result)));
                });
            }

            while let Some(joined) = requests.join_next().await {
                if let Err(err) = joined {
                    warn!(error = %err, "fan-out request did not finish");
                }
            }
            manager.delivery.deliver(Box::new(on_all));
        })
    }

    // == Start Tracked ==
    /// Like [`request_bytes`](Self::request_bytes), with the fetch tracked under `identifier`.
    ///
    /// A cache hit completes at once without touching the registry. A live
    /// task already registered under `identifier` is replaced; the replaced
    /// task's result is neither cached nor delivered. `on_complete` runs
    /// through the delivery sink, and never runs if the task is cancelled first.
    pub async fn start_tracked<F>(&self, url: &str, identifier: TaskIdentifier, on_complete: F)
    where
        F: FnOnce(Result<Blob>) + Send + 'static,
    {
        let cached = self.cache.write().await.get(url);
        if let Some(bytes) = cached {
            debug!(url, identifier, "tracked request served from cache");
            self.delivery.deliver(Box::new(move || on_complete(Ok(bytes))));
            return;
        }

        let (tx, rx) = oneshot::channel();
        let task = self.fetcher.fetch(url, move |result| {
            let _ = tx.send(result);
        });
        let task_id = task.id();
        self.tasks.lock().await.register(identifier, task);

        let manager = self.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let outcome = rx.await;
            let still_live = manager.tasks.lock().await.finish(identifier, task_id);

            let Ok(result) = outcome else {
                debug!(url = %url, identifier, "tracked fetch ended without a result");
                return;
            };
            if !still_live {
                debug!(url = %url, identifier, "discarding result of replaced request");
                return;
            }

            let result = match result {
                Ok(bytes) => {
                    manager.store(&url, bytes.clone()).await;
                    Ok(bytes)
                }
                Err(err) => Err(AssetError::from(err)),
            };
            manager.delivery.deliver(Box::new(move || on_complete(result)));
        });
    }

    // == Cancel ==
    /// Cancels the task tracked under `identifier`.
    ///
    /// Returns true when a running fetch was stopped; its callback never runs
    /// and nothing is cached. Returns false when no task is tracked or the
    /// fetch already completed, in which case its result is still delivered.
    pub async fn cancel(&self, identifier: TaskIdentifier) -> bool {
        let cancelled = self.tasks.lock().await.cancel(identifier);
        if cancelled {
            debug!(identifier, "tracked request cancelled");
        }
        cancelled
    }

    pub async fn is_tracking(&self, identifier: TaskIdentifier) -> bool {
        self.tasks.lock().await.contains(identifier)
    }

    pub async fn tracked_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    // == Internals ==
    /// Reads `url` from the cache, fetching it on a miss. Stores nothing.
    async fn load(&self, url: &str) -> Result<(Blob, Source)> {
        let cached = self.cache.write().await.lookup(url);
        if let Some(hit) = cached {
            debug!(url, "cache hit");
            return Ok((
                hit.bytes,
                Source::Cache {
                    generation: hit.generation,
                },
            ));
        }

        debug!(url, "cache miss, fetching");
        let bytes = self.fetch(url).await?;
        Ok((bytes, Source::Network))
    }

    /// Fetches `url` once and waits for its completion.
    async fn fetch(&self, url: &str) -> std::result::Result<Blob, NetworkError> {
        let (tx, rx) = oneshot::channel();
        self.fetcher.fetch(url, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or(Err(NetworkError::Cancelled))
    }

    async fn store(&self, url: &str, bytes: Blob) -> u64 {
        self.cache.write().await.set(url, bytes)
    }

    /// Turns a decoder failure into an error, dropping cached bytes that produced it.
    async fn reject<E>(&self, url: &str, source: &Source, err: E) -> AssetError
    where
        E: Into<BoxError>,
    {
        let err = AssetError::decode(err);
        log_failure(&err, url);
        if matches!(source, Source::Cache { .. }) {
            self.cache.write().await.remove(url);
            self.sequences.lock().await.remove(url);
        }
        err
    }

    /// The retained sequence for `url`, if it still matches the cached bytes.
    async fn retained<T>(&self, url: &str) -> Option<Arc<Vec<T>>>
    where
        T: Send + Sync + 'static,
    {
        let generation = self.cache.write().await.generation_of(url)?;
        self.sequences.lock().await.get::<T>(url, generation)
    }
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}
