//! In-memory tiered TTL cache
//!
//! Values are stored as serialized JSON under a per-tier map. Expiry is lazy:
//! an expired entry is treated as absent and dropped when observed. When a
//! tier exceeds its capacity the least-recently-used entry is evicted.
//!
//! `get_or_compute` is the "wrap any read with caching" entry point: misses
//! for the same key serialize behind a per-key lock so the underlying
//! computation runs once. Computation failures are never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex as AsyncMutex;

use super::CacheTier;
use crate::error::{CacheError, Result};

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
    last_access: Instant,
}

#[derive(Default)]
struct TierState {
    entries: HashMap<String, CacheEntry>,
}

/// Tiered in-memory cache shared by commands and the cached query client.
pub struct TieredCache {
    slots: [Mutex<TierState>; 4],
    inflight: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

fn slot_index(tier: CacheTier) -> usize {
    match tier {
        CacheTier::Static => 0,
        CacheTier::Config => 1,
        CacheTier::Operational => 2,
        CacheTier::Metrics => 3,
    }
}

impl Default for TieredCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TieredCache {
    pub fn new() -> Self {
        Self {
            slots: [
                Mutex::new(TierState::default()),
                Mutex::new(TierState::default()),
                Mutex::new(TierState::default()),
                Mutex::new(TierState::default()),
            ],
            inflight: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Get a cached value if present and not expired.
    pub fn get<T: DeserializeOwned>(&self, tier: CacheTier, key: &str) -> Option<T> {
        let mut state = self.slots[slot_index(tier)].lock().ok()?;
        let now = Instant::now();

        match state.entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.last_access = now;
                serde_json::from_slice(&entry.data).ok()
            }
            Some(_) => {
                // Lazy expiry: drop the stale entry now that we've seen it.
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a value; always overwrites. TTL comes from the tier policy.
    pub fn set<T: Serialize>(&self, tier: CacheTier, key: &str, value: &T) -> Result<()> {
        let data =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_bytes(tier, key, data, tier.ttl());
        Ok(())
    }

    fn set_bytes(&self, tier: CacheTier, key: &str, data: Vec<u8>, ttl: Duration) {
        let Ok(mut state) = self.slots[slot_index(tier)].lock() else {
            return;
        };
        let now = Instant::now();

        if !state.entries.contains_key(key) && state.entries.len() >= tier.max_entries() {
            let victim = state
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                log::debug!("Evicting LRU entry from {} tier", tier.name());
                state.entries.remove(&victim);
            }
        }

        state.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: now + ttl,
                last_access: now,
            },
        );
    }

    /// Remove a single entry.
    #[allow(dead_code)]
    pub fn invalidate(&self, tier: CacheTier, key: &str) {
        if let Ok(mut state) = self.slots[slot_index(tier)].lock() {
            state.entries.remove(key);
        }
    }

    /// Remove everything; returns the number of entries dropped.
    #[allow(dead_code)]
    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        for slot in &self.slots {
            if let Ok(mut state) = slot.lock() {
                removed += state.entries.len();
                state.entries.clear();
            }
        }
        removed
    }

    /// Per-tier and aggregate statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut tiers = Vec::with_capacity(CacheTier::ALL.len());

        for tier in CacheTier::ALL {
            let (entries, valid, size_bytes) = match self.slots[slot_index(tier)].lock() {
                Ok(state) => {
                    let entries = state.entries.len();
                    let valid = state
                        .entries
                        .values()
                        .filter(|e| e.expires_at > now)
                        .count();
                    let size: usize = state.entries.values().map(|e| e.data.len()).sum();
                    (entries, valid, size)
                }
                Err(_) => (0, 0, 0),
            };
            tiers.push(TierStats {
                tier: tier.name(),
                entries,
                valid,
                expired: entries - valid,
                size_bytes,
            });
        }

        CacheStats { tiers }
    }

    /// Compute-through read with per-key single-flight locking.
    ///
    /// Concurrent callers missing on the same key wait for the first
    /// computation instead of issuing their own. If the computation fails,
    /// nothing is stored and the error propagates unchanged; waiters then
    /// retry their own computation.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        tier: CacheTier,
        key: &str,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(tier, key) {
            return Ok(hit);
        }

        let guard_key = format!("{}:{}", tier.name(), key);
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(guard_key.clone()).or_default())
        };

        let outcome = {
            let _guard = lock.lock().await;

            // A waiter may find the entry already filled by the first caller.
            if let Some(hit) = self.get(tier, key) {
                Ok(hit)
            } else {
                match compute().await {
                    Ok(value) => {
                        if let Err(e) = self.set(tier, key, &value) {
                            log::warn!("Failed to cache {}: {}", key, e);
                        }
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        self.inflight.lock().await.remove(&guard_key);
        outcome
    }
}

/// Statistics for one tier
#[derive(Debug, Clone, serde::Serialize)]
pub struct TierStats {
    pub tier: &'static str,
    pub entries: usize,
    pub valid: usize,
    pub expired: usize,
    pub size_bytes: usize,
}

/// Statistics across all tiers
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub tiers: Vec<TierStats>,
}

impl CacheStats {
    pub fn total_entries(&self) -> usize {
        self.tiers.iter().map(|t| t.entries).sum()
    }

    pub fn valid_entries(&self) -> usize {
        self.tiers.iter().map(|t| t.valid).sum()
    }

    pub fn total_size_bytes(&self) -> usize {
        self.tiers.iter().map(|t| t.size_bytes).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_set_get_roundtrip() {
        let cache = TieredCache::new();
        cache
            .set(CacheTier::Config, "k1", &vec!["a", "b"])
            .unwrap();

        let hit: Option<Vec<String>> = cache.get(CacheTier::Config, "k1");
        assert_eq!(hit, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_tiers_do_not_share_keys() {
        let cache = TieredCache::new();
        cache.set(CacheTier::Config, "k1", &1u32).unwrap();

        let other: Option<u32> = cache.get(CacheTier::Metrics, "k1");
        assert_eq!(other, None);
    }

    #[test]
    fn test_expired_entry_absent() {
        let cache = TieredCache::new();
        cache.set_bytes(CacheTier::Metrics, "k1", b"1".to_vec(), Duration::ZERO);

        let hit: Option<u32> = cache.get(CacheTier::Metrics, "k1");
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn test_value_valid_until_ttl_then_absent() {
        let cache = TieredCache::new();
        cache.set_bytes(
            CacheTier::Metrics,
            "k1",
            b"42".to_vec(),
            Duration::from_millis(50),
        );

        let hit: Option<u32> = cache.get(CacheTier::Metrics, "k1");
        assert_eq!(hit, Some(42));

        tokio::time::sleep(Duration::from_millis(70)).await;
        let hit: Option<u32> = cache.get(CacheTier::Metrics, "k1");
        assert_eq!(hit, None);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = TieredCache::new();
        cache.set(CacheTier::Config, "k1", &1u32).unwrap();
        cache.set(CacheTier::Config, "k1", &2u32).unwrap();

        let hit: Option<u32> = cache.get(CacheTier::Config, "k1");
        assert_eq!(hit, Some(2));
    }

    #[test]
    fn test_invalidate() {
        let cache = TieredCache::new();
        cache.set(CacheTier::Config, "k1", &1u32).unwrap();
        cache.invalidate(CacheTier::Config, "k1");

        let hit: Option<u32> = cache.get(CacheTier::Config, "k1");
        assert_eq!(hit, None);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = TieredCache::new();
        let max = CacheTier::Static.max_entries();

        for i in 0..=max {
            cache
                .set(CacheTier::Static, &format!("k{}", i), &(i as u64))
                .unwrap();
        }

        // First key was least recently used and got evicted.
        let first: Option<u64> = cache.get(CacheTier::Static, "k0");
        assert_eq!(first, None);
        let second: Option<u64> = cache.get(CacheTier::Static, "k1");
        assert_eq!(second, Some(1));
        assert_eq!(cache.stats().total_entries(), max);
    }

    #[test]
    fn test_stats_counts() {
        let cache = TieredCache::new();
        cache.set(CacheTier::Config, "k1", &1u32).unwrap();
        cache.set(CacheTier::Metrics, "k2", &2u32).unwrap();
        cache.set_bytes(CacheTier::Metrics, "k3", b"3".to_vec(), Duration::ZERO);

        let stats = cache.stats();
        assert_eq!(stats.total_entries(), 3);
        assert_eq!(stats.valid_entries(), 2);
        assert!(stats.total_size_bytes() > 0);
    }

    #[test]
    fn test_clear_all() {
        let cache = TieredCache::new();
        cache.set(CacheTier::Config, "k1", &1u32).unwrap();
        cache.set(CacheTier::Static, "k2", &2u32).unwrap();

        assert_eq!(cache.clear_all(), 2);
        assert_eq!(cache.stats().total_entries(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let cache = Arc::new(TieredCache::new());
        let computations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let computations = Arc::clone(&computations);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute(CacheTier::Operational, "shared", || async move {
                        computations.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(7u32)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 7);
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unlocked_racers_compute_at_most_n() {
        // Callers bypassing get_or_compute race: each may redundantly compute,
        // but never more than once per caller, and the cache ends consistent.
        let cache = Arc::new(TieredCache::new());
        let computations = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let computations = Arc::clone(&computations);
            tasks.push(tokio::spawn(async move {
                let hit: Option<u32> = cache.get(CacheTier::Operational, "racy");
                if let Some(v) = hit {
                    return v;
                }
                computations.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.set(CacheTier::Operational, "racy", &9u32).unwrap();
                9
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 9);
        }
        assert!(computations.load(Ordering::SeqCst) <= 4);

        let settled: Option<u32> = cache.get(CacheTier::Operational, "racy");
        assert_eq!(settled, Some(9));
    }

    #[tokio::test]
    async fn test_compute_failure_not_cached() {
        let cache = TieredCache::new();
        let computations = AtomicUsize::new(0);

        let counter = &computations;
        let failed: Result<u32> = cache
            .get_or_compute(CacheTier::Config, "flaky", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(crate::error::ApiError::ServerError("down".to_string()).into())
            })
            .await;
        assert!(failed.is_err());

        let ok: Result<u32> = cache
            .get_or_compute(CacheTier::Config, "flaky", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(5)
            })
            .await;
        assert_eq!(ok.unwrap(), 5);
        assert_eq!(computations.load(Ordering::SeqCst), 2);

        // Third call is a pure hit.
        let hit: Result<u32> = cache
            .get_or_compute(CacheTier::Config, "flaky", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(6)
            })
            .await;
        assert_eq!(hit.unwrap(), 5);
        assert_eq!(computations.load(Ordering::SeqCst), 2);
    }
}
