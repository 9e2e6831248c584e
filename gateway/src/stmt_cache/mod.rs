//! C6: a bounded cache of prepared statements keyed by SQL fingerprint.
//! Modeled on the teacher's `Arc<RwLock<LruCache<K, V>>>` table cache,
//! generalized to support an oldest-first strategy and a guaranteed,
//! exactly-once close of whatever gets evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::config::EvictionStrategy;
use common::lifecycle::Lifecycle;
use tracing::debug;

pub struct StmtCacheEntry<S> {
    pub statement: S,
    created: Instant,
    last_used: Instant,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StmtCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl StmtCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner<S> {
    entries: HashMap<String, StmtCacheEntry<S>>,
    order: VecDeque<String>,
    stats: StmtCacheStats,
}

/// Bounded statement cache. `S` is the driver's prepared-statement
/// handle; `closer` is invoked exactly once per entry, whether it is
/// evicted for capacity, expired by TTL, or the cache is dropped.
pub struct StmtCache<S> {
    capacity: usize,
    strategy: EvictionStrategy,
    ttl: Option<Duration>,
    sweep_interval: Option<Duration>,
    closer: Arc<dyn Fn(S) + Send + Sync>,
    inner: Arc<Mutex<Inner<S>>>,
    running: Arc<AtomicBool>,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<S> StmtCache<S> {
    pub fn new(
        capacity: usize,
        strategy: EvictionStrategy,
        ttl: Option<Duration>,
        sweep_interval: Option<Duration>,
        closer: Arc<dyn Fn(S) + Send + Sync>,
    ) -> Self {
        StmtCache {
            capacity: capacity.max(1),
            strategy,
            ttl,
            sweep_interval,
            closer,
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                stats: StmtCacheStats::default(),
            })),
            running: Arc::new(AtomicBool::new(false)),
            sweeper: Mutex::new(None),
        }
    }

    pub fn stats(&self) -> StmtCacheStats {
        self.inner.lock().unwrap().stats
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the cache held a live (non-expired) entry for
    /// `key`; an expired hit is closed and counted as a miss.
    pub fn contains(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        self.reap_if_expired(&mut inner, key);
        inner.entries.contains_key(key)
    }

    /// Looks up `key` and, on the LRU strategy, promotes it to
    /// most-recently-used. Returns `None` and bumps `misses` on a miss
    /// or an expired entry (the expired entry is closed first).
    pub fn touch(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        self.reap_if_expired(&mut inner, key);
        if inner.entries.contains_key(key) {
            if matches!(self.strategy, EvictionStrategy::Lru) {
                inner.order.retain(|k| k != key);
                inner.order.push_back(key.to_string());
            }
            if let Some(e) = inner.entries.get_mut(key) {
                e.last_used = Instant::now();
            }
            inner.stats.hits += 1;
            true
        } else {
            inner.stats.misses += 1;
            false
        }
    }

    /// Inserts `statement` under `key`, evicting (and closing) the
    /// oldest entry first if the cache is at capacity. If `key` is
    /// already present its previous statement is closed and replaced.
    pub fn put(&self, key: &str, statement: S) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(old) = inner.entries.remove(key) {
            inner.order.retain(|k| k != key);
            (self.closer)(old.statement);
        }

        while inner.entries.len() >= self.capacity {
            if let Some(evict_key) = inner.order.pop_front() {
                if let Some(evicted) = inner.entries.remove(&evict_key) {
                    debug!(key = %evict_key, "evicting statement cache entry");
                    inner.stats.evictions += 1;
                    (self.closer)(evicted.statement);
                }
            } else {
                break;
            }
        }

        let now = Instant::now();
        inner.entries.insert(
            key.to_string(),
            StmtCacheEntry {
                statement,
                created: now,
                last_used: now,
            },
        );
        inner.order.push_back(key.to_string());
    }

    /// Takes ownership of the cached statement for `key`, removing it
    /// from the cache without closing it — the caller now owns its
    /// lifecycle (typically: use it, then hand it back via `put`).
    pub fn take(&self, key: &str) -> Option<S> {
        let mut inner = self.inner.lock().unwrap();
        self.reap_if_expired(&mut inner, key);
        if let Some(entry) = inner.entries.remove(key) {
            inner.order.retain(|k| k != key);
            Some(entry.statement)
        } else {
            None
        }
    }

    fn sweep_expired(inner: &Mutex<Inner<S>>, ttl: Duration, closer: &Arc<dyn Fn(S) + Send + Sync>) {
        let mut inner = inner.lock().unwrap();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.created.elapsed() > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            if let Some(entry) = inner.entries.remove(&key) {
                inner.order.retain(|k| k != &key);
                inner.stats.expirations += 1;
                (closer)(entry.statement);
            }
        }
    }

    fn reap_if_expired(&self, inner: &mut Inner<S>, key: &str) {
        let Some(ttl) = self.ttl else { return };
        let expired = inner
            .entries
            .get(key)
            .map(|e| e.created.elapsed() > ttl)
            .unwrap_or(false);
        if expired {
            if let Some(entry) = inner.entries.remove(key) {
                inner.order.retain(|k| k != key);
                inner.stats.expirations += 1;
                (self.closer)(entry.statement);
            }
        }
    }
}

impl<S: Send + 'static> Lifecycle for StmtCache<S> {
    fn start(&self) {
        let Some(ttl) = self.ttl else { return };
        let Some(interval) = self.sweep_interval else { return };
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let closer = Arc::clone(&self.closer);
        let running = Arc::clone(&self.running);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                debug!("sweeping expired statement cache entries");
                Self::sweep_expired(&inner, ttl, &closer);
            }
        });
        *self.sweeper.lock().unwrap() = Some(handle);
    }

    fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.sweeper.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl<S> Drop for StmtCache<S> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        for (_, entry) in inner.entries.drain() {
            (self.closer)(entry.statement);
        }
        inner.order.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_closer() -> (Arc<dyn Fn(u32) + Send + Sync>, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let closed2 = Arc::clone(&closed);
        let closer: Arc<dyn Fn(u32) + Send + Sync> = Arc::new(move |_s: u32| {
            closed2.fetch_add(1, Ordering::SeqCst);
        });
        (closer, closed)
    }

    #[test]
    fn lru_evicts_the_least_recently_used_entry() {
        let (closer, closed) = counting_closer();
        let cache = StmtCache::new(2, EvictionStrategy::Lru, None, None, closer);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.touch("a"); // promote a; b is now the LRU entry
        cache.put("c", 3); // evicts b
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn oldest_first_ignores_access_recency() {
        let (closer, closed) = counting_closer();
        let cache = StmtCache::new(2, EvictionStrategy::OldestFirst, None, None, closer);
        cache.put("a", 1);
        cache.put("b", 2);
        cache.touch("a"); // must NOT matter under this strategy
        cache.put("c", 3); // still evicts a, the first inserted
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn every_evicted_entry_is_closed_exactly_once() {
        let (closer, closed) = counting_closer();
        let cache = StmtCache::new(1, EvictionStrategy::Lru, None, None, closer);
        for i in 0..5u32 {
            cache.put(&i.to_string(), i);
        }
        // 5 inserts into capacity-1 cache: 4 evictions + 1 still resident
        assert_eq!(closed.load(Ordering::SeqCst), 4);
        drop(cache);
    }

    #[test]
    fn drop_closes_all_remaining_entries() {
        let (closer, closed) = counting_closer();
        {
            let cache = StmtCache::new(4, EvictionStrategy::Lru, None, None, closer);
            cache.put("a", 1);
            cache.put("b", 2);
        }
        assert_eq!(closed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn ttl_expires_an_entry_as_a_safety_net_even_under_capacity() {
        let (closer, closed) = counting_closer();
        let cache = StmtCache::new(10, EvictionStrategy::Lru, Some(Duration::from_millis(5)), None, closer);
        cache.put("a", 1);
        std::thread::sleep(Duration::from_millis(30));
        assert!(!cache.contains("a"));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
    }
}
