//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every field has a default, so an empty object is a valid configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Session settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Defaults for the random-number tool and prompt.
    #[serde(default)]
    pub random: RandomConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "server.request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.random.default_min >= self.random.default_max {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "random.default_min ({}) must be less than random.default_max ({})",
                    self.random.default_min, self.random.default_max
                ),
            });
        }

        for bound in [self.random.default_min, self.random.default_max] {
            if !(-RandomConfig::LIMIT..=RandomConfig::LIMIT).contains(&bound) {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "random defaults must lie within ±{}, got {bound}",
                        RandomConfig::LIMIT
                    ),
                });
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Seconds an invocation may run before it is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// The per-invocation deadline.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
        }
    }
}

const fn default_request_timeout() -> u64 {
    30
}

/// Range used by the random-number capabilities when the caller omits one.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomConfig {
    /// Default lower bound (inclusive).
    #[serde(default = "default_min")]
    pub default_min: i64,

    /// Default upper bound (inclusive).
    #[serde(default = "default_max")]
    pub default_max: i64,
}

impl RandomConfig {
    /// Largest magnitude accepted for a bound, so `max - min` cannot overflow.
    pub const LIMIT: i64 = 1_000_000_000;
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            default_min: default_min(),
            default_max: default_max(),
        }
    }
}

const fn default_min() -> i64 {
    1
}

const fn default_max() -> i64 {
    100
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.random.default_min, 1);
        assert_eq!(config.random.default_max, 100);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "request_timeout_secs": 5
            },
            "random": {
                "default_min": -10,
                "default_max": 10
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.request_timeout_secs, 5);
        assert_eq!(config.random.default_min, -10);
        assert_eq!(config.random.default_max, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_inverted_random_defaults() {
        let json = r#"{ "random": { "default_min": 100, "default_max": 100 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_out_of_range_random_defaults() {
        let json = r#"{ "random": { "default_max": 9000000000 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_timeout() {
        let json = r#"{ "server": { "request_timeout_secs": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
