//! Conditional-response caching and single-flight de-duplication.
//!
//! Completed responses are cached under their fully-resolved URL together
//! with the ETag the server reported, so later identical GETs can revalidate
//! with `If-None-Match` and be served locally on a 304. GETs marked immutable
//! skip revalidation entirely and collapse concurrent identical requests onto
//! one in-flight operation.
//!
//! The engine only reads and writes through the [`CacheStore`] contract and
//! never evicts; stores own their eviction policy, advised by each entry's
//! declared size.

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::Error;
use crate::Resource;

/// Weighted capacity of the process-wide default store.
const DEFAULT_CACHE_CAPACITY: u64 = 500_000;

pub(crate) type SharedOutcome =
    Shared<BoxFuture<'static, std::result::Result<Resource, Arc<Error>>>>;

/// A completed, revalidatable result.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    /// The classified result served on a 304.
    pub value: Resource,
    /// The version token presented in `If-None-Match` on revalidation.
    pub etag: Option<String>,
    /// The status the response was stored under.
    pub status: u16,
    /// Size hint for the store's eviction policy, in bytes.
    pub size: u64,
}

/// A handle to an in-flight immutable GET that concurrent callers share.
#[derive(Clone)]
pub struct InFlight {
    future: SharedOutcome,
}

impl InFlight {
    pub(crate) fn new(future: SharedOutcome) -> Self {
        Self { future }
    }

    /// Waits for the shared operation and returns its outcome.
    pub async fn outcome(&self) -> std::result::Result<Resource, Arc<Error>> {
        self.future.clone().await
    }
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InFlight(..)")
    }
}

/// One cache slot: either a settled result or a pinned in-flight operation.
///
/// At most one live entry exists per URL. A `Pending` entry is only ever
/// installed for GETs marked immutable and is replaced by a `Settled` entry
/// once the operation completes (or removed if it fails).
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// A completed result with its revalidation metadata.
    Settled(CachedPage),
    /// A not-yet-settled single-flight placeholder.
    Pending(InFlight),
}

impl CacheEntry {
    /// Builds a settled entry.
    pub fn settled(value: Resource, etag: Option<String>, status: u16, size: u64) -> Self {
        CacheEntry::Settled(CachedPage {
            value,
            etag,
            status,
            size,
        })
    }

    /// The weight a size-bounded store should account this entry at.
    pub fn weight(&self) -> u64 {
        match self {
            CacheEntry::Settled(page) => page.size.max(1),
            CacheEntry::Pending(_) => 1,
        }
    }
}

/// The key/value contract the orchestration engine caches through.
///
/// Implementations decide eviction and size-bounding on their own; the
/// engine only gets, sets, and removes entries keyed by resolved URL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up the entry for a resolved URL.
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores (or replaces) the entry for a resolved URL.
    async fn set(&self, key: &str, entry: CacheEntry);

    /// Drops the entry for a resolved URL, if present.
    async fn remove(&self, key: &str);
}

/// In-memory, size-bounded cache store backed by `moka`.
///
/// Entries are weighted by their declared size (the response's
/// `Content-Length` when known), so the capacity bounds total cached bytes
/// rather than entry count. Least-recently-used entries are evicted once the
/// budget is exceeded.
///
/// # Examples
///
/// ```
/// use hubwire::cache::MemoryCache;
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryCache::new(1_000_000));
/// ```
pub struct MemoryCache {
    cache: moka::future::Cache<String, CacheEntry>,
}

impl MemoryCache {
    /// Creates a store bounded to roughly `max_weight` cached bytes.
    pub fn new(max_weight: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(max_weight)
            .weigher(|_key: &String, entry: &CacheEntry| {
                entry.weight().min(u32::MAX as u64) as u32
            })
            .build();
        Self { cache }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.cache.get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        self.cache.insert(key.to_string(), entry).await;
    }

    async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}

static DEFAULT_CACHE: LazyLock<Arc<MemoryCache>> =
    LazyLock::new(|| Arc::new(MemoryCache::default()));

/// The process-wide store used when no layer configures one.
pub(crate) fn default_cache() -> Arc<dyn CacheStore> {
    DEFAULT_CACHE.clone()
}
