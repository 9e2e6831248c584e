use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::lifecycle::Lifecycle;
use dashmap::DashMap;
use tracing::debug;

use crate::record::Value;

use super::{CacheProvider, CacheStatus};

struct Entry {
    value: Value,
    created: Instant,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() >= at)
    }
}

/// In-process result cache. Expired entries are reaped lazily on read
/// and by a periodic background sweep, so a quiet repository doesn't
/// hold on to stale memory indefinitely.
pub struct MemoryCacheProvider {
    repos: Arc<DashMap<String, DashMap<String, Entry>>>,
    repo_defaults: DashMap<String, Duration>,
    process_default_ttl: Option<Duration>,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
    sweeper: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MemoryCacheProvider {
    pub fn new(sweep_interval: Duration, process_default_ttl: Option<Duration>) -> Self {
        MemoryCacheProvider {
            repos: Arc::new(DashMap::new()),
            repo_defaults: DashMap::new(),
            process_default_ttl,
            sweep_interval,
            running: Arc::new(AtomicBool::new(false)),
            sweeper: std::sync::Mutex::new(None),
        }
    }

    /// Resolution order: an explicit per-call TTL wins, then the
    /// repository's registered default, then the process-wide default.
    fn resolve_ttl(&self, repo: &str, explicit: Option<Duration>) -> Option<Duration> {
        explicit
            .or_else(|| self.repo_defaults.get(repo).map(|d| *d))
            .or(self.process_default_ttl)
    }

    fn sweep_once(repos: &DashMap<String, DashMap<String, Entry>>) {
        for repo in repos.iter() {
            repo.value().retain(|_, e| !e.is_expired());
        }
    }
}

impl Lifecycle for MemoryCacheProvider {
    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let repos = Arc::clone(&self.repos);
        let running = Arc::clone(&self.running);
        let interval = self.sweep_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                debug!("sweeping expired result cache entries");
                Self::sweep_once(&repos);
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

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, repo: &str, key: &str) -> Option<Value> {
        let bucket = self.repos.get(repo)?;
        let entry = bucket.get(key)?;
        if entry.is_expired() {
            drop(entry);
            bucket.remove(key);
            return None;
        }
        Some(entry.value.shallow_clone())
    }

    async fn set(&self, repo: &str, key: &str, value: Value, ttl: Option<Duration>) {
        let ttl = self.resolve_ttl(repo, ttl);
        let bucket = self.repos.entry(repo.to_string()).or_insert_with(DashMap::new);
        bucket.insert(
            key.to_string(),
            Entry {
                value,
                created: Instant::now(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
    }

    async fn delete(&self, repo: &str, key: &str) -> bool {
        match self.repos.get(repo) {
            Some(bucket) => bucket.remove(key).is_some(),
            None => false,
        }
    }

    async fn clear_repo(&self, repo: &str) {
        self.repos.remove(repo);
    }

    async fn create_repository(&self, repo: &str, ttl: Duration) {
        self.repo_defaults.insert(repo.to_string(), ttl);
        self.repos.entry(repo.to_string()).or_insert_with(DashMap::new);
    }

    async fn clear_all(&self) {
        self.repos.clear();
    }

    async fn status(&self) -> CacheStatus {
        let mut entry_count = 0usize;
        let mut approx_bytes = 0usize;
        for repo in self.repos.iter() {
            entry_count += repo.value().len();
            for e in repo.value().iter() {
                approx_bytes += estimate_size(&e.value().value);
            }
        }
        CacheStatus {
            repo_count: self.repos.len(),
            entry_count,
            approx_bytes,
        }
    }
}

fn estimate_size(v: &Value) -> usize {
    match v {
        Value::Null | Value::Bool(_) => 1,
        Value::I64(_) | Value::U64(_) | Value::F64(_) => 8,
        Value::Str(s) => s.len(),
        Value::Bytes(b) => b.len(),
        Value::Time(_) => 12,
        Value::Array(items) => items.iter().map(estimate_size).sum(),
        Value::Record(r) => r.keys().iter().map(|k| k.len() + 16).sum(),
        Value::Opaque(j) => j.to_string().len(),
    }
}
