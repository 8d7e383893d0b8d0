//! The routing cache (component A): a short-TTL, bounded, in-memory map from
//! unified model name to a resolved candidate list.
//!
//! Modeled as a read-through cache in front of the mapping resolver. It
//! never talks to the repository itself and never reports errors — a miss
//! is simply "consult the source".

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use gateway_model::ResolvedCandidate;
use tokio_util::sync::CancellationToken;

/// A cached candidate list with the bookkeeping needed for TTL expiry and
/// approximate-LRU eviction. `hits` is atomic so a lookup can bump it while
/// holding only a shared read lock on the surrounding map.
struct CacheEntry {
    candidates: Vec<ResolvedCandidate>,
    created_at: Instant,
    expires_at: Instant,
    hits: AtomicU64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Coarse estimate of resident bytes: entry count times an assumed
    /// average candidate-list footprint. Not precise, logging-only.
    pub estimated_bytes: usize,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

const ASSUMED_CANDIDATE_BYTES: usize = 256;

/// Configuration for the routing cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_size: usize,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_size: 1000,
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
}

/// The routing cache. Cheap to clone: internally an `Arc`-free handle is not
/// provided, so callers share one instance behind an `Arc` the way the
/// resolver does.
pub struct RoutingCache {
    config: CacheConfig,
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    cleaner_cancel: CancellationToken,
}

impl RoutingCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Inner { entries: HashMap::new() }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            cleaner_cancel: CancellationToken::new(),
        }
    }

    /// Look up `name`. Returns a deep copy; mutating it never affects the
    /// cached value. Reads take only the shared read lock, so concurrent
    /// lookups never serialize behind one another; hit/miss bookkeeping is
    /// atomic for the same reason. An expired entry is treated as a miss and
    /// is left for the next cleanup sweep rather than removed eagerly, since
    /// removal would require the write lock on every expired read.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Vec<ResolvedCandidate>> {
        let now = Instant::now();
        let inner = self.inner.read().unwrap();
        match inner.entries.get(name) {
            Some(entry) if entry.expires_at > now => {
                entry.hits.fetch_add(1, Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.candidates.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a deep copy of `candidates` under `name`. Evicts the
    /// oldest-created entry (approximate LRU by creation) if the cache is
    /// full and `name` is not already present.
    pub fn set(&self, name: &str, candidates: &[ResolvedCandidate]) {
        let now = Instant::now();
        let entry = CacheEntry {
            candidates: candidates.to_vec(),
            created_at: now,
            expires_at: now + self.config.ttl,
            hits: AtomicU64::new(0),
        };

        let mut inner = self.inner.write().unwrap();
        if !inner.entries.contains_key(name) && inner.entries.len() >= self.config.max_size {
            if let Some(oldest_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest_key);
            }
        }
        inner.entries.insert(name.to_owned(), entry);
    }

    pub fn delete(&self, name: &str) {
        self.inner.write().unwrap().entries.remove(name);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.read().unwrap();
        CacheStats {
            size: inner.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            estimated_bytes: inner.entries.len() * ASSUMED_CANDIDATE_BYTES,
        }
    }

    fn sweep_expired(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write().unwrap();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "routing cache cleanup swept expired entries");
        }
    }

    /// Spawn the background cleaner. Returns a handle whose cancellation
    /// token is shared with `close`; dropping the returned task handle does
    /// not stop the cleaner, calling `close` does.
    pub fn spawn_cleaner(self: std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let interval_dur = self.config.cleanup_interval;
        let cancel = self.cleaner_cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => self.sweep_expired(),
                }
            }
        })
    }

    /// Stop the background cleaner. Idempotent.
    pub fn close(&self) {
        self.cleaner_cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(provider_id: i64) -> ResolvedCandidate {
        ResolvedCandidate {
            mapping_id: provider_id,
            provider_id,
            target_model: "gpt-4o".to_owned(),
            weight: 10,
            priority: 1,
            enabled: true,
            provider: gateway_model::ProviderSnapshot {
                id: provider_id,
                name: format!("provider-{provider_id}"),
                base_url: "https://example.com".to_owned(),
                enabled: true,
                health_status: gateway_model::HealthStatus::Healthy,
            },
        }
    }

    #[test]
    fn miss_then_hit() {
        let cache = RoutingCache::new(CacheConfig::default());
        assert!(cache.get("gpt-4o").is_none());
        cache.set("gpt-4o", &[candidate(1)]);
        let hit = cache.get("gpt-4o").unwrap();
        assert_eq!(hit.len(), 1);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn get_is_a_deep_copy() {
        let cache = RoutingCache::new(CacheConfig::default());
        cache.set("gpt-4o", &[candidate(1)]);
        let mut copy = cache.get("gpt-4o").unwrap();
        copy[0].weight = 999;
        let fresh = cache.get("gpt-4o").unwrap();
        assert_eq!(fresh[0].weight, 10);
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = RoutingCache::new(CacheConfig {
            ttl: Duration::from_millis(1),
            ..CacheConfig::default()
        });
        cache.set("gpt-4o", &[candidate(1)]);
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("gpt-4o").is_none());
    }

    #[test]
    fn evicts_oldest_created_when_full() {
        let cache = RoutingCache::new(CacheConfig {
            max_size: 2,
            ..CacheConfig::default()
        });
        cache.set("a", &[candidate(1)]);
        std::thread::sleep(Duration::from_millis(5));
        cache.set("b", &[candidate(2)]);
        std::thread::sleep(Duration::from_millis(5));
        cache.set("c", &[candidate(3)]);

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn delete_and_clear() {
        let cache = RoutingCache::new(CacheConfig::default());
        cache.set("a", &[candidate(1)]);
        cache.set("b", &[candidate(2)]);
        cache.delete("a");
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        cache.clear();
        assert!(cache.get("b").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cleaner_sweeps_expired_entries() {
        let cache = std::sync::Arc::new(RoutingCache::new(CacheConfig {
            ttl: Duration::from_millis(5),
            cleanup_interval: Duration::from_millis(10),
            ..CacheConfig::default()
        }));
        cache.set("a", &[candidate(1)]);
        let handle = cache.clone().spawn_cleaner();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.inner.read().unwrap().entries.len(), 0);
        cache.close();
        handle.await.unwrap();
    }
}
