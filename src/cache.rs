use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::Error;

/// Default TTL for cached data
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

/// Default TTL for cached fetcher failures; shorter than data TTL so
/// upstream recovery is picked up quickly
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(30);

pub const DEFAULT_NAMESPACE: &str = "default";

/// A cache slot holds either real data or a marker for a failed fetch.
/// The two are never confusable: an error marker expires on its own
/// (shorter) TTL and is never served as stale data.
enum Slot<T> {
    Data(T),
    Error(String),
}

struct CacheEntry<T> {
    slot: Slot<T>,
    #[allow(dead_code)]
    stored_at: Instant,
    valid_until: Instant,
}

/// Result of a cache lookup
#[derive(Debug, PartialEq)]
pub enum Lookup<T> {
    /// Entry present and within its TTL
    Fresh(T),
    /// Entry past its TTL, returned because stale-while-revalidate was
    /// requested; the caller is expected to trigger a refresh
    Stale(T),
    /// An unexpired error marker from a recent failed fetch
    CachedError(String),
    Miss,
}

impl<T> Lookup<T> {
    pub fn into_data(self) -> Option<T> {
        match self {
            Lookup::Fresh(data) | Lookup::Stale(data) => Some(data),
            Lookup::CachedError(_) | Lookup::Miss => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    pub ttl: Duration,
    pub namespace: &'static str,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            namespace: DEFAULT_NAMESPACE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetOptions {
    pub namespace: &'static str,
    pub stale_while_revalidate: bool,
    pub force_refresh: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE,
            stale_while_revalidate: false,
            force_refresh: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub namespace: &'static str,
    pub ttl: Duration,
    pub stale_while_revalidate: bool,
    pub error_ttl: Duration,
    pub force_refresh: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE,
            ttl: DEFAULT_TTL,
            stale_while_revalidate: true,
            error_ttl: DEFAULT_ERROR_TTL,
            force_refresh: false,
        }
    }
}

/// Cumulative lookup counters; never reset for the process lifetime
/// (`keys` is the live entry count, so `clear` does reset it)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
    pub keys: usize,
}

/// A namespaced in-memory cache with per-entry TTL, explicit
/// stale-vs-fresh lookups, short-TTL error caching and per-key refresh
/// claims for fetch deduplication.
///
/// Keys are stored as `"{namespace}:{key}"`, which makes bulk
/// invalidation of a namespace a prefix scan. There is no size-based
/// eviction: keys are low-cardinality in practice.
pub struct Cache<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    refreshing: Mutex<HashSet<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
}

fn full_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

impl<T: Clone + Send + Sync> Cache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            refreshing: Mutex::new(HashSet::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
        }
    }

    /// Store a value, unconditionally overwriting any prior entry
    pub async fn set(&self, key: &str, data: T, options: SetOptions) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.insert(
            full_key(options.namespace, key),
            CacheEntry {
                slot: Slot::Data(data),
                stored_at: now,
                valid_until: now + options.ttl,
            },
        );
    }

    /// Store an error marker under the same key space, with its own
    /// (shorter) TTL, so repeated upstream failures do not trigger a
    /// fetch per request
    pub async fn set_error(
        &self,
        key: &str,
        message: String,
        error_ttl: Duration,
        namespace: &'static str,
    ) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.insert(
            full_key(namespace, key),
            CacheEntry {
                slot: Slot::Error(message),
                stored_at: now,
                valid_until: now + error_ttl,
            },
        );
    }

    pub async fn get(&self, key: &str, options: GetOptions) -> Lookup<T> {
        if options.force_refresh {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Lookup::Miss;
        }

        let entries = self.entries.read().await;
        let Some(entry) = entries.get(&full_key(options.namespace, key))
        else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Lookup::Miss;
        };

        let expired = Instant::now() > entry.valid_until;

        match &entry.slot {
            Slot::Data(data) if !expired => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Fresh(data.clone())
            },
            Slot::Data(data) if options.stale_while_revalidate => {
                self.stale_hits.fetch_add(1, Ordering::Relaxed);
                Lookup::Stale(data.clone())
            },
            Slot::Error(message) if !expired => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Lookup::CachedError(message.clone())
            },
            // Expired error markers are never served stale
            Slot::Data(_) | Slot::Error(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss
            },
        }
    }

    /// Remove exactly one entry
    pub async fn invalidate(&self, key: &str, namespace: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(&full_key(namespace, key));
    }

    /// Remove every entry in a namespace via prefix scan
    pub async fn invalidate_namespace(&self, namespace: &str) {
        let prefix = format!("{}:", namespace);
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            keys: self.entries.read().await.len(),
        }
    }

    pub async fn is_refreshing(
        &self,
        key: &str,
        namespace: &str,
    ) -> bool {
        let refreshing = self.refreshing.lock().await;
        refreshing.contains(&full_key(namespace, key))
    }

    /// Atomically claim the refresh for a key. Returns `true` only for
    /// the caller that won the claim; the set insert under the lock is
    /// the claim itself, so two callers can never both win.
    pub async fn try_claim_refresh(
        &self,
        key: &str,
        namespace: &str,
    ) -> bool {
        let mut refreshing = self.refreshing.lock().await;
        refreshing.insert(full_key(namespace, key))
    }

    pub async fn complete_refresh(&self, key: &str, namespace: &str) {
        let mut refreshing = self.refreshing.lock().await;
        refreshing.remove(&full_key(namespace, key));
    }
}

impl<T: Clone + Send + Sync> Default for Cache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Cache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .field("stale_hits", &self.stale_hits)
            .finish()
    }
}

/// Fetches a cached value or computes it with the provided async
/// fetcher, with stale-while-revalidate and refresh deduplication:
///
/// 1. if another caller already claimed the refresh for this key, any
///    cached value (stale allowed) is served without fetching; with
///    nothing cached the fetch happens anyway, unclaimed
/// 2. a fresh hit returns immediately, no fetch
/// 3. an unexpired cached error returns the error without fetching
/// 4. otherwise the fetcher runs; success stores and returns the fresh
///    value, failure stores an error marker and falls back to stale
///    data when available, else propagates
pub async fn with_cache<T, F, Fut>(
    cache: &Cache<T>,
    key: &str,
    fetcher: F,
    options: FetchOptions,
) -> Result<T, Error>
where
    T: Clone + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    if !options.force_refresh
        && cache.is_refreshing(key, options.namespace).await
    {
        match cache
            .get(
                key,
                GetOptions {
                    namespace: options.namespace,
                    stale_while_revalidate: true,
                    force_refresh: false,
                },
            )
            .await
        {
            Lookup::Fresh(data) | Lookup::Stale(data) => return Ok(data),
            Lookup::CachedError(message) => {
                return Err(Error::UpstreamFetch(message));
            },
            Lookup::Miss => {},
        }
    }

    let stale_fallback = match cache
        .get(
            key,
            GetOptions {
                namespace: options.namespace,
                stale_while_revalidate: options.stale_while_revalidate,
                force_refresh: options.force_refresh,
            },
        )
        .await
    {
        Lookup::Fresh(data) => return Ok(data),
        Lookup::CachedError(message) => {
            return Err(Error::UpstreamFetch(message));
        },
        Lookup::Stale(data) => Some(data),
        Lookup::Miss => None,
    };

    let claimed = cache.try_claim_refresh(key, options.namespace).await;

    // Losing the claim means another fetch is in flight; stale data is
    // good enough until it lands. A cold key has nothing to serve, so
    // the duplicate fetch is accepted.
    if !claimed && !options.force_refresh {
        if let Some(data) = stale_fallback.as_ref() {
            return Ok(data.clone());
        }
    }

    let result = fetcher().await;

    match result {
        Ok(data) => {
            cache
                .set(
                    key,
                    data.clone(),
                    SetOptions {
                        ttl: options.ttl,
                        namespace: options.namespace,
                    },
                )
                .await;
            if claimed {
                cache.complete_refresh(key, options.namespace).await;
            }
            Ok(data)
        },
        Err(err) => {
            cache
                .set_error(
                    key,
                    err.to_string(),
                    options.error_ttl,
                    options.namespace,
                )
                .await;
            if claimed {
                cache.complete_refresh(key, options.namespace).await;
            }

            match stale_fallback {
                Some(data) if options.stale_while_revalidate => {
                    warn!(
                        key = key,
                        namespace = options.namespace,
                        "fetch failed, serving stale data: {}",
                        err
                    );
                    Ok(data)
                },
                _ => Err(err),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    const SHORT_TTL: Duration = Duration::from_millis(50);
    const PAST_TTL: Duration = Duration::from_millis(80);

    fn short_set() -> SetOptions {
        SetOptions {
            ttl: SHORT_TTL,
            ..SetOptions::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_hit_returns_stored_value() {
        let cache = Cache::new();
        cache.set("k", 7, SetOptions::default()).await;

        let lookup = cache.get("k", GetOptions::default()).await;
        assert_eq!(lookup, Lookup::Fresh(7));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.keys, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_without_swr() {
        let cache = Cache::new();
        cache.set("k", 7, short_set()).await;
        tokio::time::sleep(PAST_TTL).await;

        let lookup = cache.get("k", GetOptions::default()).await;
        assert_eq!(lookup, Lookup::Miss);
        assert_eq!(cache.stats().await.misses, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_served_stale_with_swr() {
        let cache = Cache::new();
        cache.set("k", 7, short_set()).await;
        tokio::time::sleep(PAST_TTL).await;

        let lookup = cache
            .get(
                "k",
                GetOptions {
                    stale_while_revalidate: true,
                    ..GetOptions::default()
                },
            )
            .await;

        // The original value, unchanged
        assert_eq!(lookup, Lookup::Stale(7));
        assert_eq!(cache.stats().await.stale_hits, 1);
    }

    #[tokio::test]
    async fn test_force_refresh_ignores_fresh_entry() {
        let cache = Cache::new();
        cache.set("k", 7, SetOptions::default()).await;

        let lookup = cache
            .get(
                "k",
                GetOptions {
                    force_refresh: true,
                    ..GetOptions::default()
                },
            )
            .await;
        assert_eq!(lookup, Lookup::Miss);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let cache = Cache::new();
        cache
            .set(
                "x",
                1,
                SetOptions {
                    namespace: "n1",
                    ..SetOptions::default()
                },
            )
            .await;
        cache
            .set(
                "x",
                2,
                SetOptions {
                    namespace: "n2",
                    ..SetOptions::default()
                },
            )
            .await;

        cache.invalidate_namespace("n1").await;

        let n1 = cache
            .get(
                "x",
                GetOptions {
                    namespace: "n1",
                    ..GetOptions::default()
                },
            )
            .await;
        let n2 = cache
            .get(
                "x",
                GetOptions {
                    namespace: "n2",
                    ..GetOptions::default()
                },
            )
            .await;

        assert_eq!(n1, Lookup::Miss);
        assert_eq!(n2, Lookup::Fresh(2));
    }

    #[tokio::test]
    async fn test_error_marker_expires_on_its_own_ttl() {
        let cache: Cache<i32> = Cache::new();
        cache
            .set_error(
                "k",
                "boom".to_string(),
                SHORT_TTL,
                DEFAULT_NAMESPACE,
            )
            .await;

        let lookup = cache.get("k", GetOptions::default()).await;
        assert_eq!(lookup, Lookup::CachedError("boom".to_string()));

        tokio::time::sleep(PAST_TTL).await;

        // Gone, even with stale-while-revalidate on
        let lookup = cache
            .get(
                "k",
                GetOptions {
                    stale_while_revalidate: true,
                    ..GetOptions::default()
                },
            )
            .await;
        assert_eq!(lookup, Lookup::Miss);
    }

    #[tokio::test]
    async fn test_invalidate_removes_single_key() {
        let cache = Cache::new();
        cache.set("a", 1, SetOptions::default()).await;
        cache.set("b", 2, SetOptions::default()).await;

        cache.invalidate("a", DEFAULT_NAMESPACE).await;

        assert_eq!(cache.get("a", GetOptions::default()).await, Lookup::Miss);
        assert_eq!(
            cache.get("b", GetOptions::default()).await,
            Lookup::Fresh(2)
        );
    }

    #[tokio::test]
    async fn test_clear_resets_key_count() {
        let cache = Cache::new();
        cache.set("a", 1, SetOptions::default()).await;
        cache.set("b", 2, SetOptions::default()).await;
        assert_eq!(cache.stats().await.keys, 2);

        cache.clear().await;
        assert_eq!(cache.stats().await.keys, 0);
    }

    #[tokio::test]
    async fn test_refresh_claim_is_won_once() {
        let cache: Cache<i32> = Cache::new();

        assert!(cache.try_claim_refresh("k", DEFAULT_NAMESPACE).await);
        assert!(!cache.try_claim_refresh("k", DEFAULT_NAMESPACE).await);
        assert!(cache.is_refreshing("k", DEFAULT_NAMESPACE).await);

        cache.complete_refresh("k", DEFAULT_NAMESPACE).await;
        assert!(cache.try_claim_refresh("k", DEFAULT_NAMESPACE).await);
    }

    #[tokio::test]
    async fn test_with_cache_fresh_hit_skips_fetch() {
        let cache = Cache::new();
        cache.set("k", 42, SetOptions::default()).await;

        let value = with_cache(
            &cache,
            "k",
            || async { panic!("should not fetch on fresh hit") },
            FetchOptions::default(),
        )
        .await;
        assert_eq!(value.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_cache_miss_fetches_and_stores() {
        let cache = Cache::new();

        let value =
            with_cache(&cache, "k", || async { Ok(5) }, FetchOptions::default())
                .await;
        assert_eq!(value.unwrap(), 5);

        assert_eq!(
            cache.get("k", GetOptions::default()).await,
            Lookup::Fresh(5)
        );
        assert!(!cache.is_refreshing("k", DEFAULT_NAMESPACE).await);
    }

    #[tokio::test]
    async fn test_with_cache_serves_stale_on_fetch_failure() {
        let cache = Cache::new();
        cache.set("k", 42, short_set()).await;
        tokio::time::sleep(PAST_TTL).await;

        let value = with_cache(
            &cache,
            "k",
            || async { Err(Error::UpstreamFetch("api down".to_string())) },
            FetchOptions {
                ttl: SHORT_TTL,
                ..FetchOptions::default()
            },
        )
        .await;

        assert_eq!(value.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_cache_propagates_error_without_fallback() {
        let cache: Cache<i32> = Cache::new();

        let value = with_cache(
            &cache,
            "k",
            || async { Err(Error::UpstreamFetch("api down".to_string())) },
            FetchOptions::default(),
        )
        .await;

        assert!(value.is_err());

        // The failure is cached: the next call short-circuits
        let value = with_cache(
            &cache,
            "k",
            || async { panic!("should not fetch while error is cached") },
            FetchOptions::default(),
        )
        .await;
        assert!(value.is_err());
    }

    #[tokio::test]
    async fn test_with_cache_cold_concurrent_fetches_at_most_twice() {
        let cache: Arc<Cache<i32>> = Arc::new(Cache::new());
        let fetch_count = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..2 {
            let cache = cache.clone();
            let fetch_count = fetch_count.clone();
            handles.push(tokio::spawn(async move {
                with_cache(
                    &cache,
                    "cold",
                    || async {
                        fetch_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(42)
                    },
                    FetchOptions::default(),
                )
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }

        // Cold key: the claim winner fetches, the loser has no stale
        // fallback and may fetch too
        let count = fetch_count.load(Ordering::SeqCst);
        assert!((1..=2).contains(&count), "fetcher ran {} times", count);
    }

    #[tokio::test]
    async fn test_with_cache_dedups_when_stale_data_exists() {
        let cache: Arc<Cache<i32>> = Arc::new(Cache::new());
        cache.set("k", 1, short_set()).await;
        tokio::time::sleep(PAST_TTL).await;

        let fetch_count = Arc::new(AtomicU32::new(0));

        let mut handles = vec![];
        for _ in 0..10 {
            let cache = cache.clone();
            let fetch_count = fetch_count.clone();
            handles.push(tokio::spawn(async move {
                with_cache(
                    &cache,
                    "k",
                    || async {
                        fetch_count.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(2)
                    },
                    FetchOptions::default(),
                )
                .await
            }));
        }

        for handle in handles {
            let value = handle.await.unwrap().unwrap();
            assert!(value == 1 || value == 2);
        }

        // With cached data present, only the claim winner fetches
        assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_cache_force_refresh_refetches() {
        let cache = Cache::new();
        cache.set("k", 1, SetOptions::default()).await;

        let value = with_cache(
            &cache,
            "k",
            || async { Ok(2) },
            FetchOptions {
                force_refresh: true,
                ..FetchOptions::default()
            },
        )
        .await;

        assert_eq!(value.unwrap(), 2);
        assert_eq!(
            cache.get("k", GetOptions::default()).await,
            Lookup::Fresh(2)
        );
    }
}
