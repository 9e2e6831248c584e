//! C5: the result cache. A small async key-value store scoped by
//! "repository" (usually a table name, or one of the reserved names
//! below), with optional per-entry TTL and a background sweeper for
//! lazily-expired entries.

mod memory;
mod remote;

pub use memory::MemoryCacheProvider;
pub use remote::RemoteCacheProvider;

use std::time::Duration;

use async_trait::async_trait;

use crate::record::Value;

/// Repository the pagination engine (C4) stores row-count fingerprints
/// under.
pub const PAGE_COUNT_REPO: &str = "__page_count__";

#[derive(Debug, Clone, Default)]
pub struct CacheStatus {
    pub repo_count: usize,
    pub entry_count: usize,
    pub approx_bytes: usize,
}

#[async_trait]
pub trait CacheProvider: Send + Sync {
    async fn get(&self, repo: &str, key: &str) -> Option<Value>;
    async fn set(&self, repo: &str, key: &str, value: Value, ttl: Option<Duration>);
    async fn delete(&self, repo: &str, key: &str) -> bool;
    async fn clear_repo(&self, repo: &str);
    async fn status(&self) -> CacheStatus;

    /// Registers a per-repository default TTL, used by `set` calls that
    /// pass no explicit TTL of their own. Resolution order is explicit →
    /// repo default → process default.
    async fn create_repository(&self, repo: &str, ttl: Duration);

    /// Drops every repository and every entry in them.
    async fn clear_all(&self);
}
