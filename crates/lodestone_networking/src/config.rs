//! # Network Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! port = 25565
//! tick_period_ms = 50
//!
//! [liveness]
//! short_timeout_secs = 30
//! long_timeout_secs = 120
//! repeat_rate = 8
//!
//! [tick_rate]
//! sample_capacity = 1200
//! short_window = 20
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::{DEFAULT_PORT, TICK_PERIOD_MS};

/// Keep-alive timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LivenessConfig {
    /// Seconds without any inbound traffic before the session is dropped.
    pub short_timeout_secs: u64,
    /// Seconds without a verified ping round trip before the session is dropped.
    pub long_timeout_secs: u64,
    /// Ping challenges issued per short timeout window.
    pub repeat_rate: u32,
}

impl LivenessConfig {
    /// Short (traffic) timeout.
    #[must_use]
    pub const fn short_timeout(&self) -> Duration {
        Duration::from_secs(self.short_timeout_secs)
    }

    /// Long (round-trip) timeout.
    #[must_use]
    pub const fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }

    /// Interval between ping challenges.
    #[must_use]
    pub fn ping_period(&self) -> Duration {
        self.short_timeout() / self.repeat_rate.max(1)
    }

    /// Number of outstanding challenges remembered.
    #[must_use]
    pub fn challenge_capacity(&self) -> usize {
        usize::try_from(self.repeat_rate.max(1)).unwrap_or(usize::MAX)
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            short_timeout_secs: 30,
            long_timeout_secs: 120,
            repeat_rate: 8,
        }
    }
}

/// Tick-rate sampling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TickRateConfig {
    /// Samples kept for the rolling average.
    pub sample_capacity: usize,
    /// Samples in the short window.
    pub short_window: usize,
}

impl Default for TickRateConfig {
    fn default() -> Self {
        Self {
            sample_capacity: 1200,
            short_window: 20,
        }
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkConfig {
    /// Listening port handed to the transport.
    pub port: u16,
    /// Scheduler period in milliseconds.
    pub tick_period_ms: u64,
    /// Keep-alive timing.
    pub liveness: LivenessConfig,
    /// Tick-rate sampling.
    pub tick_rate: TickRateConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_period_ms: TICK_PERIOD_MS,
            liveness: LivenessConfig::default(),
            tick_rate: TickRateConfig::default(),
        }
    }
}

impl NetworkConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on bad syntax or unknown keys,
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`NetworkConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded network config from {}", path.display());
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_owned()));

        if self.tick_period_ms == 0 {
            return invalid("tick_period_ms must be greater than zero");
        }
        if self.liveness.short_timeout_secs == 0 {
            return invalid("liveness.short_timeout_secs must be greater than zero");
        }
        if self.liveness.repeat_rate == 0 {
            return invalid("liveness.repeat_rate must be greater than zero");
        }
        if self.liveness.long_timeout_secs <= self.liveness.short_timeout_secs {
            return invalid("liveness.long_timeout_secs must exceed short_timeout_secs");
        }
        if self.tick_rate.short_window == 0 {
            return invalid("tick_rate.short_window must be greater than zero");
        }
        if self.tick_rate.sample_capacity <= self.tick_rate.short_window {
            return invalid("tick_rate.sample_capacity must exceed short_window");
        }
        Ok(())
    }

    /// Scheduler period.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = NetworkConfig::from_toml_str("").unwrap();

        assert_eq!(config, NetworkConfig::default());
        assert_eq!(config.port, 25565);
        assert_eq!(config.tick_period(), Duration::from_millis(50));
        assert_eq!(config.liveness.ping_period(), Duration::from_millis(3750));
        assert_eq!(config.liveness.challenge_capacity(), 8);
    }

    #[test]
    fn test_partial_override() {
        let config = NetworkConfig::from_toml_str(
            r"
            port = 25570

            [liveness]
            repeat_rate = 4
            ",
        )
        .unwrap();

        assert_eq!(config.port, 25570);
        assert_eq!(config.liveness.repeat_rate, 4);
        assert_eq!(config.liveness.short_timeout_secs, 30);
        assert_eq!(config.tick_rate.sample_capacity, 1200);
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            NetworkConfig::from_toml_str("max_clients = 5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_ranges() {
        for source in [
            "tick_period_ms = 0",
            "[liveness]\nrepeat_rate = 0",
            "[liveness]\nlong_timeout_secs = 30",
            "[tick_rate]\nshort_window = 0",
            "[tick_rate]\nsample_capacity = 20",
        ] {
            assert!(
                matches!(NetworkConfig::from_toml_str(source), Err(ConfigError::Invalid(_))),
                "accepted {source:?}"
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let err = NetworkConfig::load("/nonexistent/lodestone.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
