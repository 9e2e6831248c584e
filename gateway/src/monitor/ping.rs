use async_trait::async_trait;
use common::err::GatewayError;

/// A single liveness probe against a database connection (typically
/// `SELECT 1` or the driver's native ping). Implemented per-driver in
/// the façade layer.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self) -> Result<(), GatewayError>;
}
