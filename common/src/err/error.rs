use thiserror::Error;

/// Error taxonomy for the gateway. Kinds follow the failure classes the
/// caller actually needs to branch on; driver-level failures are wrapped
/// rather than flattened so the SQL text and bound arguments survive for
/// diagnostics.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid sql: {0}")]
    InvalidSql(String),

    #[error("unsupported sql: {0}")]
    UnsupportedSql(String),

    #[error("sql injection suspected in fragment: {0}")]
    SqlInjectionSuspected(String),

    #[error("cache provider not initialized: {0}")]
    NotInitialized(String),

    #[error("primary key missing for table `{0}`")]
    PrimaryKeyMissing(String),

    #[error("primary key `{0}` not present in record")]
    PrimaryKeyNotInRecord(String),

    #[error("optimistic lock conflict on table `{table}`: expected version {expected}")]
    VersionMismatch { table: String, expected: i64 },

    #[error("coercion failure: cannot convert {from} to {to}")]
    CoercionFailure { from: &'static str, to: &'static str },

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("circular reference detected while serializing record")]
    CircularReference,

    #[error("json serialization depth exceeded")]
    DepthExceeded,

    #[error("driver error while executing `{sql}` with args {args:?}: {source}")]
    DriverError {
        sql: String,
        args: Vec<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to parse configuration file: {0}")]
    ConfigParseError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        GatewayError::InvalidArgument(msg.into())
    }

    pub fn driver<E: std::error::Error + Send + Sync + 'static>(
        sql: impl Into<String>,
        args: Vec<String>,
        source: E,
    ) -> Self {
        GatewayError::DriverError {
            sql: sql.into(),
            args,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invalid_argument_formats_message() {
        let e = GatewayError::invalid_argument("page must be >= 1");
        assert_eq!(e.to_string(), "invalid argument: page must be >= 1");
    }

    #[test]
    fn version_mismatch_formats_table_and_expected() {
        let e = GatewayError::VersionMismatch {
            table: "users".into(),
            expected: 3,
        };
        assert!(e.to_string().contains("users"));
        assert!(e.to_string().contains('3'));
    }
}
