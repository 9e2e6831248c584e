use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::err::GatewayError;

/// Process-wide gateway configuration, loaded once at startup (or defaulted)
/// and handed to every component that needs a tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base: BaseConfig,
    pub statement_cache: StatementCacheConfig,
    pub result_cache: ResultCacheConfig,
    pub pagination: PaginationConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Process-wide debug flag (affects only the default tracing level).
    pub debug: bool,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvictionStrategy {
    Lru,
    OldestFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementCacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    /// Safety-net TTL in seconds; 0 disables TTL enforcement.
    pub ttl_secs: u64,
    pub strategy: EvictionStrategy,
    /// Background sweep interval in seconds; 0 disables the sweeper.
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCacheConfig {
    pub sweep_interval_secs: u64,
    pub default_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub max_page_size: u32,
    pub default_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub normal_interval_secs: u64,
    pub error_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub max_concurrent_pings: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base: BaseConfig::default(),
            statement_cache: StatementCacheConfig::default(),
            result_cache: ResultCacheConfig::default(),
            pagination: PaginationConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl Default for BaseConfig {
    fn default() -> Self {
        BaseConfig {
            debug: false,
            log_dir: Some(String::from("/tmp/gateway")),
        }
    }
}

impl Default for StatementCacheConfig {
    fn default() -> Self {
        StatementCacheConfig {
            enabled: true,
            max_size: 1000,
            ttl_secs: 0,
            strategy: EvictionStrategy::Lru,
            sweep_interval_secs: 60,
        }
    }
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        ResultCacheConfig {
            sweep_interval_secs: 30,
            default_ttl_secs: 0,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            max_page_size: 1000,
            default_page_size: 20,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            normal_interval_secs: 30,
            error_interval_secs: 5,
            ping_timeout_secs: 3,
            max_concurrent_pings: 5,
        }
    }
}

impl BaseConfig {
    pub fn get_log_dir(&self) -> Option<String> {
        self.log_dir.clone()
    }
}

/// Reads a TOML configuration file from disk; missing fields fall back to
/// `GatewayConfig::default()`'s values via `#[serde(default)]`-free
/// structs, so a partial file must still supply every top-level section.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig, GatewayError> {
    let mut file = File::open(path.as_ref())?;
    let mut s = String::new();
    file.read_to_string(&mut s)?;

    toml::from_str(s.as_str()).map_err(|e| GatewayError::ConfigParseError(e.to_string()))
}
