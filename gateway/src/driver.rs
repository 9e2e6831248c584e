//! Storage-facing seams the façade and pagination engine run against.
//! A concrete integration (mysql_async, tokio-postgres, ...) implements
//! these; this crate only ever talks to the trait objects.

use async_trait::async_trait;
use common::err::GatewayError;

use crate::record::{Record, Value};

/// An opaque prepared-statement handle. The statement cache (C6) only
/// ever moves these around and closes them; it never inspects `handle`,
/// which a concrete driver downcasts back to its own connection-bound
/// statement type.
pub struct PreparedStatement {
    pub sql: String,
    pub handle: Box<dyn std::any::Any + Send + Sync>,
}

#[async_trait]
pub trait Transaction: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError>;
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, GatewayError>;
    async fn savepoint(&self, name: &str) -> Result<(), GatewayError>;
    async fn release_savepoint(&self, name: &str) -> Result<(), GatewayError>;
    async fn rollback_to_savepoint(&self, name: &str) -> Result<(), GatewayError>;
    async fn commit(self: Box<Self>) -> Result<(), GatewayError>;
    async fn rollback(self: Box<Self>) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait Driver: Send + Sync {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError>;
    async fn query(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, GatewayError>;
    async fn query_scalar_u64(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError>;
    async fn begin(&self) -> Result<Box<dyn Transaction>, GatewayError>;
    async fn ping(&self) -> Result<(), GatewayError>;

    /// Prepares `sql` against the underlying connection. The returned
    /// handle is owned by the caller (typically the statement cache)
    /// until it's passed back to [`Driver::close_statement`].
    async fn prepare(&self, sql: &str) -> Result<PreparedStatement, GatewayError>;

    /// Releases a prepared statement on the underlying connection.
    async fn close_statement(&self, stmt: PreparedStatement) -> Result<(), GatewayError>;
}

/// Adapts any `Driver` to the pagination engine's narrower executor
/// seam, so C4 doesn't need to know about transactions or writes.
pub struct DriverExecutor<'a>(pub &'a dyn Driver);

#[async_trait]
impl<'a> crate::sql::pagination::PageExecutor for DriverExecutor<'a> {
    async fn fetch_rows(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, GatewayError> {
        self.0.query(sql, args).await
    }

    async fn fetch_count(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError> {
        self.0.query_scalar_u64(sql, args).await
    }
}

/// Adapts a `Driver` to the connection monitor's ping seam.
pub struct DriverPinger<D: Driver>(pub std::sync::Arc<D>);

#[async_trait]
impl<D: Driver> crate::monitor::Pinger for DriverPinger<D> {
    async fn ping(&self) -> Result<(), GatewayError> {
        self.0.ping().await
    }
}
