//! Configuration for the ITDE services.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable values fall back to the default; [`ItdeConfig::validate`]
//! rejects values that parse but make no sense.

use itde_runtime::StoreConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting that must be positive was zero
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
}

/// ITDE configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItdeConfig {
    /// Per-target signal event buffer (`ITDE_BROADCAST_CAPACITY`, default 64)
    pub broadcast_capacity: usize,
    /// Open the review modal automatically when signals are waiting
    /// (`ITDE_AUTO_POPUP`, default true)
    pub auto_popup: bool,
    /// Bound on one payload resolution in milliseconds
    /// (`ITDE_RESOLVE_TIMEOUT_MS`, default 10000)
    pub resolve_timeout_ms: u64,
    /// Grace period for in-flight work when a controller unmounts
    /// (`ITDE_SHUTDOWN_TIMEOUT_MS`, default 5000)
    pub shutdown_timeout_ms: u64,
}

impl Default for ItdeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 64,
            auto_popup: true,
            resolve_timeout_ms: 10_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl ItdeConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// ```
    /// use itde::ItdeConfig;
    ///
    /// let config = ItdeConfig::from_lookup(|key| match key {
    ///     "ITDE_AUTO_POPUP" => Some("false".to_string()),
    ///     _ => None,
    /// });
    /// assert!(!config.auto_popup);
    /// assert_eq!(config.broadcast_capacity, 64);
    /// ```
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            broadcast_capacity: lookup("ITDE_BROADCAST_CAPACITY")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.broadcast_capacity),
            auto_popup: lookup("ITDE_AUTO_POPUP")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.auto_popup),
            resolve_timeout_ms: lookup("ITDE_RESOLVE_TIMEOUT_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.resolve_timeout_ms),
            shutdown_timeout_ms: lookup("ITDE_SHUTDOWN_TIMEOUT_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.shutdown_timeout_ms),
        }
    }

    /// Check the configuration for values that cannot work
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] if the broadcast capacity or the resolve
    /// timeout is zero.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Zero("broadcast_capacity"));
        }
        if self.resolve_timeout_ms == 0 {
            return Err(ConfigError::Zero("resolve_timeout_ms"));
        }
        Ok(())
    }

    /// Resolve timeout as a [`Duration`]
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Shutdown timeout as a [`Duration`]
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Store settings for controllers built from this configuration
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default().with_shutdown_timeout(self.shutdown_timeout())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(ItdeConfig::from_lookup(|_| None), ItdeConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = ItdeConfig::from_lookup(lookup(&[
            ("ITDE_BROADCAST_CAPACITY", "8"),
            ("ITDE_AUTO_POPUP", "off"),
            ("ITDE_RESOLVE_TIMEOUT_MS", "250"),
            ("ITDE_SHUTDOWN_TIMEOUT_MS", "100"),
        ]));

        assert_eq!(config.broadcast_capacity, 8);
        assert!(!config.auto_popup);
        assert_eq!(config.resolve_timeout(), Duration::from_millis(250));
        assert_eq!(config.shutdown_timeout(), Duration::from_millis(100));
        assert_eq!(
            config.store_config().default_shutdown_timeout,
            Duration::from_millis(100)
        );
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = ItdeConfig::from_lookup(lookup(&[
            ("ITDE_BROADCAST_CAPACITY", "lots"),
            ("ITDE_AUTO_POPUP", "maybe"),
        ]));
        assert_eq!(config, ItdeConfig::default());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let config = ItdeConfig::from_lookup(lookup(&[("ITDE_BROADCAST_CAPACITY", "0")]));
        assert_eq!(config.validate(), Err(ConfigError::Zero("broadcast_capacity")));
        assert_eq!(ItdeConfig::default().validate(), Ok(()));
    }
}
