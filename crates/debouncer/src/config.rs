//! Debouncer configuration

use crate::{DebounceError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Debouncer configuration
///
/// Usually embedded in a larger TOML document, e.g.
///
/// ```toml
/// interval_ms = 250
/// thread_name = "save-debouncer"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Tick interval in milliseconds (default: 300)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Name of the background loop thread (default: "debouncer")
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl DebounceConfig {
    /// Config with the given interval and default thread name
    ///
    /// The config stores whole milliseconds, so sub-millisecond parts are
    /// rounded up: 500µs becomes 1ms and 1.5ms becomes 2ms.
    pub fn with_interval(interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        Self {
            interval_ms: millis.try_into().unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Parse a config from TOML; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Reject values the debouncer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(DebounceError::InvalidArgument(
                "interval_ms must be greater than zero".into(),
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(DebounceError::InvalidArgument(
                "thread_name must not contain NUL bytes".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            thread_name: default_thread_name(),
        }
    }
}

/// Reject intervals a ticker cannot run with
pub(crate) fn check_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(DebounceError::InvalidArgument(
            "interval must be greater than zero".into(),
        ));
    }
    Ok(())
}

fn default_interval_ms() -> u64 {
    300
}

fn default_thread_name() -> String {
    "debouncer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DebounceConfig::default();
        assert_eq!(config.interval(), Duration::from_millis(300));
        assert_eq!(config.thread_name, "debouncer");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() -> anyhow::Result<()> {
        let config = DebounceConfig::from_toml_str("")?;
        assert_eq!(config, DebounceConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_toml() -> anyhow::Result<()> {
        let config = DebounceConfig::from_toml_str("interval_ms = 50\n")?;
        assert_eq!(config.interval(), Duration::from_millis(50));
        assert_eq!(config.thread_name, "debouncer");
        Ok(())
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = DebounceConfig::from_toml_str("interval_ms = 0").unwrap_err();
        assert!(matches!(err, DebounceError::InvalidArgument(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = DebounceConfig::from_toml_str("interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, DebounceError::Config(_)));
    }

    #[test]
    fn test_with_interval() {
        let config = DebounceConfig::with_interval(Duration::from_secs(2));
        assert_eq!(config.interval_ms, 2000);
        assert_eq!(config.thread_name, "debouncer");
    }

    #[test]
    fn test_with_interval_rounds_up_to_millis() {
        let config = DebounceConfig::with_interval(Duration::from_micros(500));
        assert_eq!(config.interval_ms, 1);
        assert!(config.validate().is_ok());

        let config = DebounceConfig::with_interval(Duration::from_micros(1500));
        assert_eq!(config.interval(), Duration::from_millis(2));

        let config = DebounceConfig::with_interval(Duration::from_millis(7));
        assert_eq!(config.interval_ms, 7);
    }

    #[test]
    fn test_check_interval() {
        assert!(check_interval(Duration::from_nanos(1)).is_ok());
        assert!(matches!(
            check_interval(Duration::ZERO),
            Err(DebounceError::InvalidArgument(_))
        ));
    }
}
