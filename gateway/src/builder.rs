//! The fluent query chain callers actually use day to day.

use std::time::Duration;

use common::err::GatewayError;

use crate::cache::CacheProvider;
use crate::decorators::TrashedMode;
use crate::driver::DriverExecutor;
use crate::gateway::Gateway;
use crate::record::{Record, Value};
use crate::sql::pagination::{paginate, Dialect, PageResult};
use crate::sql::validator::{validate_fragment, validate_identifier};

#[derive(Clone, Copy, PartialEq, Eq)]
enum CacheMode {
    Disabled,
    Local,
    Remote,
}

pub struct QueryBuilder<'g> {
    gateway: &'g Gateway,
    table: String,
    where_clause: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<u64>,
    trashed_mode: TrashedMode,
    cache_mode: CacheMode,
    cache_ttl: Option<Duration>,
}

impl<'g> QueryBuilder<'g> {
    pub(crate) fn new(gateway: &'g Gateway, table: impl Into<String>) -> Self {
        QueryBuilder {
            gateway,
            table: table.into(),
            where_clause: None,
            args: Vec::new(),
            order_by: None,
            limit: None,
            trashed_mode: TrashedMode::Exclude,
            cache_mode: CacheMode::Disabled,
            cache_ttl: None,
        }
    }

    fn fork(&self) -> Self {
        QueryBuilder {
            gateway: self.gateway,
            table: self.table.clone(),
            where_clause: self.where_clause.clone(),
            args: self.args.iter().map(Value::shallow_clone).collect(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            trashed_mode: self.trashed_mode,
            cache_mode: self.cache_mode,
            cache_ttl: self.cache_ttl,
        }
    }

    pub fn where_clause(mut self, clause: impl Into<String>, args: Vec<Value>) -> Result<Self, GatewayError> {
        let clause = clause.into();
        validate_fragment(&clause)?;
        self.where_clause = Some(clause);
        self.args = args;
        Ok(self)
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Result<Self, GatewayError> {
        let clause = clause.into();
        validate_fragment(&clause)?;
        self.order_by = Some(clause);
        Ok(self)
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn with_trashed(mut self) -> Self {
        self.trashed_mode = TrashedMode::WithTrashed;
        self
    }

    pub fn only_trashed(mut self) -> Self {
        self.trashed_mode = TrashedMode::OnlyTrashed;
        self
    }

    pub fn local_cache(mut self, ttl: Duration) -> Self {
        self.cache_mode = CacheMode::Local;
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn remote_cache(mut self, ttl: Duration) -> Self {
        self.cache_mode = CacheMode::Remote;
        self.cache_ttl = Some(ttl);
        self
    }

    /// Alias for [`QueryBuilder::local_cache`]: the common case.
    pub fn cache(self, ttl: Duration) -> Self {
        self.local_cache(ttl)
    }

    fn effective_where(&self) -> String {
        let sd = self.gateway.decorators().soft_delete_predicate(&self.table, self.trashed_mode);
        match (&self.where_clause, sd) {
            (Some(w), Some(sd)) => format!("({w}) AND {sd}"),
            (Some(w), None) => w.clone(),
            (None, Some(sd)) => sd,
            (None, None) => String::new(),
        }
    }

    fn select_sql(&self) -> String {
        let where_ = self.effective_where();
        let mut sql = format!("SELECT * FROM {}", self.table);
        if !where_.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_);
        }
        if let Some(ob) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(ob);
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        sql
    }

    fn resolve_cache(&self) -> Option<&dyn CacheProvider> {
        match self.cache_mode {
            CacheMode::Disabled => None,
            CacheMode::Local => Some(self.gateway.local_cache()),
            CacheMode::Remote => self.gateway.remote_cache(),
        }
    }

    pub async fn find(&self) -> Result<Vec<Record>, GatewayError> {
        validate_identifier(&self.table)?;
        let sql = self.select_sql();
        self.gateway.ensure_prepared(&sql).await?;
        self.gateway.driver().query(&sql, &self.args).await
    }

    pub async fn find_first(&self) -> Result<Option<Record>, GatewayError> {
        let mut narrowed = self.fork();
        narrowed.limit = Some(1);
        let mut rows = narrowed.find().await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    pub async fn exists(&self) -> Result<bool, GatewayError> {
        Ok(self.count().await? > 0)
    }

    pub async fn count(&self) -> Result<u64, GatewayError> {
        validate_identifier(&self.table)?;
        let where_ = self.effective_where();
        let mut sql = format!("SELECT COUNT(*) FROM {}", self.table);
        if !where_.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_);
        }
        self.gateway.ensure_prepared(&sql).await?;
        self.gateway.driver().query_scalar_u64(&sql, &self.args).await
    }

    pub async fn paginate(&self, dialect: &dyn Dialect, page: u64, size: u64) -> Result<PageResult, GatewayError> {
        validate_identifier(&self.table)?;
        let where_ = self.effective_where();
        let mut sql = format!("SELECT * FROM {}", self.table);
        if !where_.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_);
        }
        if let Some(ob) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(ob);
        }
        self.gateway.ensure_prepared(&sql).await?;
        let executor = DriverExecutor(self.gateway.driver());
        paginate(
            &executor,
            dialect,
            self.resolve_cache(),
            &sql,
            &self.args,
            page,
            size,
            self.gateway.config().pagination.max_page_size as u64,
        )
        .await
    }
}
