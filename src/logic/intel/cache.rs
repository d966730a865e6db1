//! Intel cache — bounded, TTL'd, single-flight
//!
//! Cache-through layer shared by the Tranco, VirusTotal and WHOIS clients.
//! Entries carry `{value, fetched_at, ttl, source, ok}`; negative results
//! (lookup failed or key not listed) are cached under a shorter TTL so a
//! broken upstream is not hammered. When N concurrent requests miss the
//! same key, exactly one upstream call fires; the rest await its result.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::OnceCell;

// ============================================================================
// ENTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// `None` is a cached negative (not listed / upstream failed)
    pub value: Option<T>,
    pub fetched_at: Instant,
    pub ttl: Duration,
    pub source: &'static str,
    pub ok: bool,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

// ============================================================================
// CACHE
// ============================================================================

pub struct IntelCache<T: Clone> {
    source: &'static str,
    entries: Mutex<LruCache<String, CacheEntry<T>>>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<Option<T>>>>>,
    positive_ttl: Duration,
    negative_ttl: Duration,
    /// Decides whether a present value earns the positive TTL. Lets a
    /// client cache "queried fine, not listed" under the negative TTL.
    positivity: fn(&T) -> bool,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn always_positive<T>(_: &T) -> bool {
    true
}

impl<T: Clone> IntelCache<T> {
    pub fn new(
        source: &'static str,
        capacity: usize,
        positive_ttl: Duration,
        negative_ttl: Duration,
    ) -> Self {
        Self::with_positivity(source, capacity, positive_ttl, negative_ttl, always_positive)
    }

    pub fn with_positivity(
        source: &'static str,
        capacity: usize,
        positive_ttl: Duration,
        negative_ttl: Duration,
        positivity: fn(&T) -> bool,
    ) -> Self {
        Self {
            source,
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
            inflight: Mutex::new(HashMap::new()),
            positive_ttl,
            negative_ttl,
            positivity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Fresh entry for `key`, if any. Outer `None` means "not cached";
    /// inner `None` is a cached negative.
    pub fn peek(&self, key: &str) -> Option<Option<T>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh() => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a result under the TTL its polarity earns. Also the priming
    /// hook for deterministic tests.
    pub fn insert(&self, key: &str, value: Option<T>) {
        let ok = value.as_ref().map(self.positivity).unwrap_or(false);
        let entry = CacheEntry {
            value,
            fetched_at: Instant::now(),
            ttl: if ok { self.positive_ttl } else { self.negative_ttl },
            source: self.source,
            ok,
        };
        self.entries.lock().put(key.to_string(), entry);
    }

    /// Cache-through lookup with single-flight miss coalescing.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<T>>,
    {
        if let Some(value) = self.peek(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let cell = {
            let mut inflight = self.inflight.lock();
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let value = cell
            .get_or_init(|| async {
                let value = fetch().await;
                self.insert(key, value.clone());
                value
            })
            .await
            .clone();

        // Drop the coalescing cell so future misses fetch again after
        // expiry. Removing an already-removed key is harmless.
        self.inflight.lock().remove(key);

        value
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            source: self.source,
            len: entries.len(),
            capacity: entries.cap().get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub source: &'static str,
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache(pos_ms: u64, neg_ms: u64) -> IntelCache<u32> {
        IntelCache::new(
            "test",
            8,
            Duration::from_millis(pos_ms),
            Duration::from_millis(neg_ms),
        )
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let c = cache(10_000, 1_000);
        c.insert("k", Some(7));
        let calls = AtomicUsize::new(0);
        let v = c
            .get_or_fetch("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(99)
            })
            .await;
        assert_eq!(v, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_negative_entry_served_under_negative_ttl() {
        let c = cache(10_000, 10_000);
        c.insert("missing", None);
        let calls = AtomicUsize::new(0);
        let v = c
            .get_or_fetch("missing", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Some(1)
            })
            .await;
        assert_eq!(v, None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let c = cache(1, 1);
        c.insert("k", Some(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        let v = c.get_or_fetch("k", || async { Some(2) }).await;
        assert_eq!(v, Some(2));
    }

    #[tokio::test]
    async fn test_single_flight_coalesces_concurrent_misses() {
        let c = Arc::new(cache(10_000, 10_000));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let c = c.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                c.get_or_fetch("same-key", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some(42)
                })
                .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Some(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one upstream call");
    }

    #[tokio::test]
    async fn test_lru_eviction_is_bounded() {
        let c = IntelCache::new(
            "test",
            2,
            Duration::from_secs(60),
            Duration::from_secs(60),
        );
        c.insert("a", Some(1));
        c.insert("b", Some(2));
        c.insert("c", Some(3));
        assert_eq!(c.stats().len, 2);
        assert_eq!(c.peek("a"), None, "oldest entry evicted");
        assert_eq!(c.peek("c"), Some(Some(3)));
    }
}
