mod error;

pub use error::GatewayError;

/// Result alias used throughout the gateway crates.
pub type GatewayResult<T> = Result<T, GatewayError>;
