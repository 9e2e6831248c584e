//! C9: the façade tying the SQL layer, caches, decorators, and a
//! storage driver together behind CRUD + query-builder entry points.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::GatewayConfig;
use common::err::GatewayError;
use common::lifecycle::Lifecycle;
use dashmap::DashMap;

use crate::builder::QueryBuilder;
use crate::cache::{CacheProvider, MemoryCacheProvider};
use crate::decorators::DecoratorRegistry;
use crate::driver::{Driver, PreparedStatement, Transaction};
use crate::record::{Record, Value};
use crate::sql::pagination::DialectTag;
use crate::sql::validator::{validate_fragment, validate_identifier};
use crate::stmt_cache::StmtCache;

/// A second database a [`Gateway`] has been told about via
/// [`Gateway::open_named`] — its own driver and dialect tag, sharing the
/// gateway's caches and statement cache.
pub struct NamedDatabase {
    pub driver: Arc<dyn Driver>,
    pub dialect: DialectTag,
}

pub struct Gateway {
    driver: Arc<dyn Driver>,
    dialect: DialectTag,
    config: GatewayConfig,
    decorators: DecoratorRegistry,
    local_cache: Arc<MemoryCacheProvider>,
    remote_cache: Option<Arc<dyn CacheProvider>>,
    stmt_cache: Arc<StmtCache<PreparedStatement>>,
    databases: DashMap<String, Arc<NamedDatabase>>,
}

impl Gateway {
    pub fn new(driver: Arc<dyn Driver>, config: GatewayConfig) -> Self {
        Self::with_dialect(driver, DialectTag::Mysql, config)
    }

    fn with_dialect(driver: Arc<dyn Driver>, dialect: DialectTag, config: GatewayConfig) -> Self {
        let local_cache = Arc::new(MemoryCacheProvider::new(
            Duration::from_secs(config.result_cache.sweep_interval_secs.max(1)),
            non_zero_secs(config.result_cache.default_ttl_secs),
        ));
        local_cache.start();

        let stmt_cache = Arc::new(StmtCache::new(
            config.statement_cache.max_size,
            config.statement_cache.strategy,
            non_zero_secs(config.statement_cache.ttl_secs),
            non_zero_secs(config.statement_cache.sweep_interval_secs),
            closing_statements_on(Arc::clone(&driver)),
        ));
        stmt_cache.start();

        let databases = DashMap::new();
        databases.insert(
            "default".to_string(),
            Arc::new(NamedDatabase { driver: Arc::clone(&driver), dialect }),
        );

        Gateway {
            driver,
            dialect,
            config,
            decorators: DecoratorRegistry::new(),
            local_cache,
            remote_cache: None,
            stmt_cache,
            databases,
        }
    }

    /// Opens the default database. `dialect_tag` is one of
    /// `mysql | postgresql | sqlite | sqlserver | oracle`; an unrecognized
    /// tag defaults to MySQL. The caller constructs `driver` against
    /// whatever concrete connection pool (DSN, pool size, ...) their
    /// driver crate needs — this crate stays storage-agnostic.
    pub fn open_database(dialect_tag: &str, driver: Arc<dyn Driver>, config: GatewayConfig) -> Self {
        Self::with_dialect(driver, DialectTag::parse(dialect_tag), config)
    }

    /// Registers an additional named database alongside the default one,
    /// sharing this gateway's caches. Returns `&Self` for chaining.
    pub fn open_named(&self, name: impl Into<String>, dialect_tag: &str, driver: Arc<dyn Driver>) -> &Self {
        self.databases.insert(
            name.into(),
            Arc::new(NamedDatabase { driver, dialect: DialectTag::parse(dialect_tag) }),
        );
        self
    }

    pub fn database(&self, name: &str) -> Option<Arc<NamedDatabase>> {
        self.databases.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn with_remote_cache(mut self, remote: Arc<dyn CacheProvider>) -> Self {
        self.remote_cache = Some(remote);
        self
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn dialect(&self) -> DialectTag {
        self.dialect
    }

    pub fn decorators(&self) -> &DecoratorRegistry {
        &self.decorators
    }

    pub fn local_cache(&self) -> &dyn CacheProvider {
        self.local_cache.as_ref()
    }

    pub fn remote_cache(&self) -> Option<&dyn CacheProvider> {
        self.remote_cache.as_deref()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn table(&self, name: impl Into<String>) -> QueryBuilder<'_> {
        QueryBuilder::new(self, name)
    }

    /// Registers a default TTL for `repo`, applied to any `set` call on
    /// it that doesn't supply its own explicit TTL.
    pub async fn create_repository(&self, repo: &str, ttl: Duration) {
        self.local_cache.create_repository(repo, ttl).await;
        if let Some(remote) = &self.remote_cache {
            remote.create_repository(repo, ttl).await;
        }
    }

    pub async fn clear_repository(&self, repo: &str) {
        self.local_cache.clear_repo(repo).await;
        if let Some(remote) = &self.remote_cache {
            remote.clear_repo(repo).await;
        }
    }

    pub async fn clear_all(&self) {
        self.local_cache.clear_all().await;
        if let Some(remote) = &self.remote_cache {
            remote.clear_all().await;
        }
    }

    pub async fn cache_status(&self) -> crate::cache::CacheStatus {
        self.local_cache.status().await
    }

    /// Warms (or refreshes) the statement cache entry for `sql`. A no-op
    /// when the statement cache is disabled in config.
    pub(crate) async fn ensure_prepared(&self, sql: &str) -> Result<(), GatewayError> {
        if !self.config.statement_cache.enabled {
            return Ok(());
        }
        if self.stmt_cache.touch(sql) {
            return Ok(());
        }
        let stmt = self.driver.prepare(sql).await?;
        self.stmt_cache.put(sql, stmt);
        Ok(())
    }

    pub fn stmt_cache_stats(&self) -> crate::stmt_cache::StmtCacheStats {
        self.stmt_cache.stats()
    }

    pub async fn insert(&self, table: &str, record: &Record) -> Result<u64, GatewayError> {
        validate_identifier(table)?;
        self.decorators.apply_before_insert(table, record);

        let keys = record.keys();
        let cols = keys.join(", ");
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("INSERT INTO {table} ({cols}) VALUES ({placeholders})");
        let args: Vec<Value> = keys.iter().map(|k| record.get(k)).collect();
        self.ensure_prepared(&sql).await?;
        self.driver.execute(&sql, &args).await
    }

    /// Inserts every record in `records` in order, applying the same
    /// decorators and error semantics as [`Gateway::insert`] per row.
    pub async fn batch_insert(&self, table: &str, records: &[Record]) -> Result<u64, GatewayError> {
        let mut total = 0u64;
        for record in records {
            total += self.insert(table, record).await?;
        }
        Ok(total)
    }

    /// Upserts `record`: updates the row keyed by `pk_col` if it carries
    /// that column, otherwise inserts a new row.
    pub async fn save(&self, table: &str, record: &Record, pk_col: &str) -> Result<u64, GatewayError> {
        if record.has(pk_col) {
            let pk_value = record.get(pk_col);
            self.update(table, record, &format!("{pk_col} = ?"), &[pk_value]).await
        } else {
            self.insert(table, record).await
        }
    }

    /// Issues a raw statement with no table-identifier validation,
    /// decorators, or soft-delete rewriting — the caller's SQL runs
    /// verbatim (modulo the safety validator).
    pub async fn exec(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError> {
        validate_fragment(sql)?;
        self.ensure_prepared(sql).await?;
        self.driver.execute(sql, args).await
    }

    pub async fn exists(&self, table: &str, where_clause: &str, where_args: &[Value]) -> Result<bool, GatewayError> {
        let count = self
            .table(table)
            .where_clause(where_clause, where_args.iter().map(Value::shallow_clone).collect())?
            .count()
            .await?;
        Ok(count > 0)
    }

    /// `where_clause`/`where_args` identify the row(s) to update. When
    /// the table has optimistic locking configured, the bumped version
    /// is appended to the `WHERE` and zero affected rows is surfaced as
    /// [`GatewayError::VersionMismatch`] rather than a silent no-op.
    pub async fn update(
        &self,
        table: &str,
        record: &Record,
        where_clause: &str,
        where_args: &[Value],
    ) -> Result<u64, GatewayError> {
        validate_identifier(table)?;
        validate_fragment(where_clause)?;

        let observed_version = self.decorators.apply_before_update(table, record);
        let keys = record.keys();
        let assignments = keys.iter().map(|k| format!("{k} = ?")).collect::<Vec<_>>().join(", ");
        let mut sql = format!("UPDATE {table} SET {assignments} WHERE {where_clause}");
        let mut args: Vec<Value> = keys.iter().map(|k| record.get(k)).collect();

        if let (Some(version_col), Some(observed)) = (self.decorators.optimistic_lock_column(table), observed_version)
        {
            sql.push_str(&format!(" AND {version_col} = ?"));
            args.push(Value::I64(observed));
        }
        args.extend(where_args.iter().map(Value::shallow_clone));

        self.ensure_prepared(&sql).await?;
        let affected = self.driver.execute(&sql, &args).await?;
        if affected == 0 {
            if let Some(expected) = observed_version {
                return Err(GatewayError::VersionMismatch {
                    table: table.to_string(),
                    expected,
                });
            }
        }
        Ok(affected)
    }

    /// Soft-deletes (sets the configured `deleted_at` column) if the
    /// table has soft-delete configured, otherwise issues a real
    /// `DELETE`.
    pub async fn delete(&self, table: &str, where_clause: &str, where_args: &[Value]) -> Result<u64, GatewayError> {
        validate_identifier(table)?;
        validate_fragment(where_clause)?;

        if let Some(deleted_at_col) = self.decorators.is_soft_delete(table) {
            let sql = format!("UPDATE {table} SET {deleted_at_col} = ? WHERE {where_clause}");
            let mut args = vec![Value::Time(Utc::now().naive_utc())];
            args.extend(where_args.iter().map(Value::shallow_clone));
            self.ensure_prepared(&sql).await?;
            self.driver.execute(&sql, &args).await
        } else {
            let sql = format!("DELETE FROM {table} WHERE {where_clause}");
            self.ensure_prepared(&sql).await?;
            self.driver.execute(&sql, where_args).await
        }
    }

    /// Undoes a soft delete by clearing the configured `deleted_at`
    /// column back to `NULL`. Errors if `table` has no soft-delete
    /// configured — there's nothing to restore.
    pub async fn restore(&self, table: &str, where_clause: &str, where_args: &[Value]) -> Result<u64, GatewayError> {
        validate_identifier(table)?;
        validate_fragment(where_clause)?;

        let Some(deleted_at_col) = self.decorators.is_soft_delete(table) else {
            return Err(GatewayError::invalid_argument(format!("table {table} has no soft-delete configured")));
        };
        let sql = format!("UPDATE {table} SET {deleted_at_col} = NULL WHERE {where_clause}");
        self.ensure_prepared(&sql).await?;
        self.driver.execute(&sql, where_args).await
    }

    /// Always issues a real `DELETE`, bypassing any soft-delete
    /// configuration on `table`.
    pub async fn force_delete(&self, table: &str, where_clause: &str, where_args: &[Value]) -> Result<u64, GatewayError> {
        validate_identifier(table)?;
        validate_fragment(where_clause)?;

        let sql = format!("DELETE FROM {table} WHERE {where_clause}");
        self.ensure_prepared(&sql).await?;
        self.driver.execute(&sql, where_args).await
    }

    pub async fn transaction(&self) -> Result<Box<dyn Transaction>, GatewayError> {
        self.driver.begin().await
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    if secs == 0 {
        None
    } else {
        Some(Duration::from_secs(secs))
    }
}

/// Builds the statement cache's eviction closer: each evicted/expired
/// statement is closed on its owning driver via a detached task, since
/// `Driver::close_statement` is async but the cache's closer is not.
fn closing_statements_on(driver: Arc<dyn Driver>) -> Arc<dyn Fn(PreparedStatement) + Send + Sync> {
    Arc::new(move |stmt: PreparedStatement| {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move {
            if let Err(e) = driver.close_statement(stmt).await {
                tracing::warn!(error = %e, "failed to close prepared statement");
            }
        });
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decorators::{OptimisticLockConfig, SoftDeleteConfig, TableDecorators, TimestampsConfig};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDriver {
        executed: Mutex<Vec<(String, Vec<Value>)>>,
        next_affected: Mutex<u64>,
    }

    #[async_trait]
    impl Driver for RecordingDriver {
        async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError> {
            self.executed
                .lock()
                .unwrap()
                .push((sql.to_string(), args.iter().map(Value::shallow_clone).collect()));
            Ok(*self.next_affected.lock().unwrap())
        }
        async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Vec<Record>, GatewayError> {
            Ok(vec![])
        }
        async fn query_scalar_u64(&self, _sql: &str, _args: &[Value]) -> Result<u64, GatewayError> {
            Ok(0)
        }
        async fn begin(&self) -> Result<Box<dyn Transaction>, GatewayError> {
            Err(GatewayError::invalid_argument("not supported in this test double"))
        }
        async fn ping(&self) -> Result<(), GatewayError> {
            Ok(())
        }
        async fn prepare(&self, sql: &str) -> Result<crate::driver::PreparedStatement, GatewayError> {
            Ok(crate::driver::PreparedStatement { sql: sql.to_string(), handle: Box::new(()) })
        }
        async fn close_statement(&self, _stmt: crate::driver::PreparedStatement) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn gateway_with(driver: RecordingDriver) -> (Gateway, Arc<RecordingDriver>) {
        let driver = Arc::new(driver);
        let gw = Gateway::new(driver.clone() as Arc<dyn Driver>, GatewayConfig::default());
        (gw, driver)
    }

    #[tokio::test]
    async fn insert_applies_timestamp_and_lock_decorators_before_building_sql() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        gw.decorators().configure(
            "users",
            TableDecorators {
                timestamps: Some(TimestampsConfig::new("created_at", "updated_at")),
                soft_delete: None,
                optimistic_lock: Some(OptimisticLockConfig::new("version")),
            },
        );
        let r = Record::new();
        r.set("name", "ada");
        gw.insert("users", &r).await.unwrap();

        assert!(r.has("created_at"));
        assert_eq!(r.get_i64("version"), 0);
        let log = driver.executed.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].0.starts_with("INSERT INTO users"));
    }

    #[tokio::test]
    async fn update_with_zero_affected_and_a_lock_column_is_a_version_mismatch() {
        let (gw, _driver) = gateway_with(RecordingDriver::default());
        gw.decorators().configure(
            "users",
            TableDecorators {
                timestamps: None,
                soft_delete: None,
                optimistic_lock: Some(OptimisticLockConfig::new("version")),
            },
        );
        let r = Record::new();
        r.set("name", "ada");
        r.set("version", 2i64);
        let err = gw.update("users", &r, "id = 1", &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::VersionMismatch { expected: 2, .. }));
    }

    #[tokio::test]
    async fn delete_on_soft_delete_table_becomes_an_update() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        gw.decorators().configure(
            "posts",
            TableDecorators {
                timestamps: None,
                soft_delete: Some(SoftDeleteConfig::new("deleted_at")),
                optimistic_lock: None,
            },
        );
        gw.delete("posts", "id = 1", &[]).await.unwrap();
        let log = driver.executed.lock().unwrap();
        assert!(log[0].0.starts_with("UPDATE posts SET deleted_at"));
    }

    #[tokio::test]
    async fn delete_without_soft_delete_is_a_real_delete() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        gw.delete("posts", "id = 1", &[]).await.unwrap();
        let log = driver.executed.lock().unwrap();
        assert!(log[0].0.starts_with("DELETE FROM posts"));
    }

    #[tokio::test]
    async fn rejects_invalid_table_identifiers() {
        let (gw, _driver) = gateway_with(RecordingDriver::default());
        let r = Record::new();
        assert!(gw.insert("users; DROP TABLE users", &r).await.is_err());
    }

    #[tokio::test]
    async fn repeated_identical_inserts_hit_the_statement_cache() {
        let (gw, _driver) = gateway_with(RecordingDriver::default());
        let r1 = Record::new();
        r1.set("name", "ada");
        let r2 = Record::new();
        r2.set("name", "grace");

        gw.insert("users", &r1).await.unwrap();
        gw.insert("users", &r2).await.unwrap();

        let stats = gw.stmt_cache_stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn save_updates_when_the_primary_key_is_present_otherwise_inserts() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        *driver.next_affected.lock().unwrap() = 1;

        let with_pk = Record::new();
        with_pk.set("id", 7i64);
        with_pk.set("name", "ada");
        gw.save("users", &with_pk, "id").await.unwrap();

        let without_pk = Record::new();
        without_pk.set("name", "grace");
        gw.save("users", &without_pk, "id").await.unwrap();

        let log = driver.executed.lock().unwrap();
        assert!(log[0].0.starts_with("UPDATE users"));
        assert!(log[1].0.starts_with("INSERT INTO users"));
    }

    #[tokio::test]
    async fn restore_clears_the_soft_delete_column() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        gw.decorators().configure(
            "posts",
            TableDecorators {
                timestamps: None,
                soft_delete: Some(SoftDeleteConfig::new("deleted_at")),
                optimistic_lock: None,
            },
        );
        gw.restore("posts", "id = 1", &[]).await.unwrap();
        let log = driver.executed.lock().unwrap();
        assert_eq!(log[0].0, "UPDATE posts SET deleted_at = NULL WHERE id = 1");
    }

    #[tokio::test]
    async fn restore_without_soft_delete_configured_is_an_error() {
        let (gw, _driver) = gateway_with(RecordingDriver::default());
        assert!(gw.restore("posts", "id = 1", &[]).await.is_err());
    }

    #[tokio::test]
    async fn force_delete_issues_a_real_delete_even_with_soft_delete_configured() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        gw.decorators().configure(
            "posts",
            TableDecorators {
                timestamps: None,
                soft_delete: Some(SoftDeleteConfig::new("deleted_at")),
                optimistic_lock: None,
            },
        );
        gw.force_delete("posts", "id = 1", &[]).await.unwrap();
        let log = driver.executed.lock().unwrap();
        assert!(log[0].0.starts_with("DELETE FROM posts"));
    }

    #[tokio::test]
    async fn batch_insert_inserts_every_record_and_sums_affected_rows() {
        let (gw, driver) = gateway_with(RecordingDriver::default());
        *driver.next_affected.lock().unwrap() = 1;
        let r1 = Record::new();
        r1.set("name", "ada");
        let r2 = Record::new();
        r2.set("name", "grace");
        let total = gw.batch_insert("users", &[r1, r2]).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(driver.executed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_dialect_tag_defaults_to_mysql() {
        let driver = Arc::new(RecordingDriver::default()) as Arc<dyn Driver>;
        let gw = Gateway::open_database("not-a-real-dialect", driver, GatewayConfig::default());
        assert_eq!(gw.dialect(), crate::sql::pagination::DialectTag::Mysql);
    }

    #[tokio::test]
    async fn open_named_registers_an_additional_database() {
        let driver = Arc::new(RecordingDriver::default()) as Arc<dyn Driver>;
        let gw = Gateway::open_database("mysql", driver, GatewayConfig::default());
        let other = Arc::new(RecordingDriver::default()) as Arc<dyn Driver>;
        gw.open_named("reporting", "postgresql", other);

        assert!(gw.database("default").is_some());
        let reporting = gw.database("reporting").unwrap();
        assert_eq!(reporting.dialect, crate::sql::pagination::DialectTag::Postgresql);
        assert!(gw.database("missing").is_none());
    }
}
