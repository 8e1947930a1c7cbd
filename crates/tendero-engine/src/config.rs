//! # Engine Configuration
//!
//! Retry schedule, per-attempt scope timeout and the store's UTC offset.
//!
//! Values come from code (builder setters) or from environment variables
//! with fallback to defaults:
//!
//! | Variable                         | Default | Meaning                          |
//! |----------------------------------|---------|----------------------------------|
//! | `TENDERO_MAX_ATTEMPTS`           | 4       | tries per operation, first incl. |
//! | `TENDERO_INITIAL_BACKOFF_MS`     | 10      | delay before the first retry     |
//! | `TENDERO_MAX_BACKOFF_MS`         | 200     | backoff cap                      |
//! | `TENDERO_BACKOFF_MULTIPLIER`     | 2.0     | growth per retry                 |
//! | `TENDERO_SCOPE_TIMEOUT_MS`       | 5000    | budget of one scope attempt      |
//! | `TENDERO_UTC_OFFSET_MINUTES`     | 0       | store local time, e.g. -180      |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::retry::RetryPolicy;

/// Largest UTC offset chrono accepts, exclusive (24h).
const MAX_OFFSET_MINUTES: u32 = 24 * 60;

/// Sale engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Attempts per operation, the first one included.
    pub max_attempts: u32,

    pub initial_backoff: Duration,

    pub max_backoff: Duration,

    pub backoff_multiplier: f64,

    /// Budget for a single scope attempt, begin to commit.
    pub scope_timeout: Duration,

    /// Offset of the store's local time; decides the ticket day.
    pub utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            scope_timeout: Duration::from_secs(5),
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = delay;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn scope_timeout(mut self, timeout: Duration) -> Self {
        self.scope_timeout = timeout;
        self
    }

    /// Sets the store offset. Out-of-range values are rejected by
    /// [`EngineConfig::validate`].
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Store local time as a chrono offset. Falls back to UTC when the
    /// configured value is out of range.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(self.initial_backoff)
            .max_delay(self.max_backoff)
            .multiplier(self.backoff_multiplier)
            .build()
    }

    /// Checks ranges the builder cannot enforce on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.utc_offset_minutes.unsigned_abs() >= MAX_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue("TENDERO_UTC_OFFSET_MINUTES".to_string()));
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(ConfigError::InvalidValue("TENDERO_BACKOFF_MULTIPLIER".to_string()));
        }
        if self.scope_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("TENDERO_SCOPE_TIMEOUT_MS".to_string()));
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup (env, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            max_attempts: parse_or(&lookup, "TENDERO_MAX_ATTEMPTS", defaults.max_attempts)?
                .max(1),
            initial_backoff: Duration::from_millis(parse_or(
                &lookup,
                "TENDERO_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )?),
            max_backoff: Duration::from_millis(parse_or(
                &lookup,
                "TENDERO_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )?),
            backoff_multiplier: parse_or(
                &lookup,
                "TENDERO_BACKOFF_MULTIPLIER",
                defaults.backoff_multiplier,
            )?,
            scope_timeout: Duration::from_millis(parse_or(
                &lookup,
                "TENDERO_SCOPE_TIMEOUT_MS",
                defaults.scope_timeout.as_millis() as u64,
            )?),
            utc_offset_minutes: parse_or(
                &lookup,
                "TENDERO_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            )?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("TENDERO_MAX_ATTEMPTS", "2"),
            ("TENDERO_SCOPE_TIMEOUT_MS", "250"),
            ("TENDERO_UTC_OFFSET_MINUTES", "-180"),
        ]))
        .unwrap();

        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.scope_timeout, Duration::from_millis(250));
        assert_eq!(config.offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_malformed_values() {
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[("TENDERO_MAX_ATTEMPTS", "many")])),
            Err(ConfigError::InvalidValue("TENDERO_MAX_ATTEMPTS".into()))
        );
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[("TENDERO_UTC_OFFSET_MINUTES", "1440")])),
            Err(ConfigError::InvalidValue("TENDERO_UTC_OFFSET_MINUTES".into()))
        );
        assert!(EngineConfig::from_lookup(lookup(&[("TENDERO_BACKOFF_MULTIPLIER", "0.5")])).is_err());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .max_attempts(0)
            .scope_timeout(Duration::from_millis(100))
            .utc_offset_minutes(330);
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.offset().local_minus_utc(), 330 * 60);
        assert!(config.validate().is_ok());
    }
}
