//! Configuration Module
//!
//! Loads service configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Capacity of the in-memory key-value cache
    pub cache_max_entries: usize,
    /// Seconds between expiration sweeps
    pub sweep_interval: u64,
    /// Seconds between purges of lapsed cache entries
    pub purge_interval: u64,
    /// Optional JSON fixture loaded into the in-memory store at startup
    pub seed_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_MAX_ENTRIES` - Cache capacity (default: 10000)
    /// - `SWEEP_INTERVAL` - Expiration sweep period in seconds (default: 60)
    /// - `PURGE_INTERVAL` - Cache purge period in seconds (default: 30)
    /// - `SEED_PATH` - Fixture file for the in-memory store (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES").unwrap_or(defaults.cache_max_entries),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            purge_interval: parse_var("PURGE_INTERVAL").unwrap_or(defaults.purge_interval),
            seed_path: env::var("SEED_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            cache_max_entries: 10_000,
            sweep_interval: 60,
            purge_interval: 30,
            seed_path: None,
        }
    }
}
