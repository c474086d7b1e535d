//! Configuration Module
//!
//! Loads the composition root's settings from environment variables
//! with sensible defaults.

use std::env;
use std::time::Duration;

/// Settings for the cache, navigation cache and realtime channel.
///
/// All values can be configured via environment variables with sensible
/// defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of items the cache can hold
    pub cache_max_size: usize,
    /// TTL applied to cache items stored without an explicit TTL
    pub cache_default_ttl: Duration,
    /// Interval between background cache sweeps
    pub cache_cleanup_interval: Duration,
    /// Navigation cache expiry horizon
    pub navigation_ttl: Duration,
    /// Realtime push endpoint
    pub ws_url: String,
}

impl Config {
    /// Creates a Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `LIVESYNC_CACHE_MAX_SIZE` - Maximum cache items (default: 100)
    /// - `LIVESYNC_CACHE_TTL_MS` - Default item TTL in ms (default: 300000)
    /// - `LIVESYNC_CLEANUP_INTERVAL_MS` - Sweep interval in ms (default: 60000)
    /// - `LIVESYNC_NAVIGATION_TTL_MS` - Navigation TTL in ms (default: 900000)
    /// - `LIVESYNC_WS_URL` - Push endpoint (default: ws://localhost/api/ws)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_max_size: env_parse("LIVESYNC_CACHE_MAX_SIZE")
                .unwrap_or(defaults.cache_max_size),
            cache_default_ttl: env_parse("LIVESYNC_CACHE_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_default_ttl),
            cache_cleanup_interval: env_parse("LIVESYNC_CLEANUP_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cache_cleanup_interval),
            navigation_ttl: env_parse("LIVESYNC_NAVIGATION_TTL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.navigation_ttl),
            ws_url: env::var("LIVESYNC_WS_URL").unwrap_or(defaults.ws_url),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_max_size: 100,
            cache_default_ttl: Duration::from_secs(5 * 60),
            cache_cleanup_interval: Duration::from_secs(60),
            navigation_ttl: Duration::from_secs(15 * 60),
            ws_url: "ws://localhost/api/ws".to_string(),
        }
    }
}

/// Parses an environment variable, ignoring unset or malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_max_size, 100);
        assert_eq!(config.cache_default_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.navigation_ttl, Duration::from_secs(900));
        assert_eq!(config.ws_url, "ws://localhost/api/ws");
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("LIVESYNC_CACHE_MAX_SIZE");
        env::remove_var("LIVESYNC_CACHE_TTL_MS");
        env::remove_var("LIVESYNC_CLEANUP_INTERVAL_MS");
        env::remove_var("LIVESYNC_NAVIGATION_TTL_MS");
        env::remove_var("LIVESYNC_WS_URL");

        let config = Config::from_env();
        assert_eq!(config.cache_max_size, 100);
        assert_eq!(config.cache_default_ttl, Duration::from_secs(300));
        assert_eq!(config.ws_url, "ws://localhost/api/ws");
    }
}
