use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::record::Value;

use super::{CacheProvider, CacheStatus};

/// Placeholder for a shared cache backend (e.g. Redis). Not wired to a
/// real client yet; every call degrades to a miss/no-op instead of
/// panicking, and logs once so the gap is visible in production logs
/// rather than silent.
pub struct RemoteCacheProvider {
    endpoint: String,
}

impl RemoteCacheProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        RemoteCacheProvider { endpoint: endpoint.into() }
    }
}

#[async_trait]
impl CacheProvider for RemoteCacheProvider {
    async fn get(&self, _repo: &str, _key: &str) -> Option<Value> {
        warn!(endpoint = %self.endpoint, "remote cache provider is not initialized, treating as a miss");
        None
    }

    async fn set(&self, _repo: &str, _key: &str, _value: Value, _ttl: Option<Duration>) {
        warn!(endpoint = %self.endpoint, "remote cache provider is not initialized, dropping write");
    }

    async fn delete(&self, _repo: &str, _key: &str) -> bool {
        false
    }

    async fn clear_repo(&self, _repo: &str) {}

    async fn create_repository(&self, _repo: &str, _ttl: Duration) {}

    async fn clear_all(&self) {}

    async fn status(&self) -> CacheStatus {
        CacheStatus::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn degrades_to_a_miss_instead_of_failing() {
        let cache = RemoteCacheProvider::new("redis://unconfigured");
        cache.set("repo", "k", Value::I64(1), None).await;
        assert!(cache.get("repo", "k").await.is_none());
    }
}
