//! # Node Configuration
//!
//! Defaults come from [`CoordinatorConfig::default`]; every value can be
//! overridden through an `AC_*` environment variable.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `AC_ENDORSEMENT_TIMEOUT_MS` | Deadline for collecting all endorsements |
//! | `AC_FINALITY_TIMEOUT_MS` | How long a responder waits for finality |
//! | `AC_ARBITER_MAX_ATTEMPTS` | Arbiter submissions before suspending |
//! | `AC_ARBITER_BACKOFF_MS` | Delay before the first resubmission |
//! | `AC_LOG` | Log filter, used when `RUST_LOG` is unset |

use ac_04_signing_coordinator::CoordinatorConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default log filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Protocol timeouts and retry policy shared by every party.
    pub coordinator: CoordinatorConfig,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse.
    #[error("{key}={value:?} is not a valid {expected}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value found.
        value: String,
        /// What was expected instead.
        expected: &'static str,
    },
    /// A value parses but makes no sense.
    #[error("{key} must be greater than zero")]
    Zero {
        /// Variable name.
        key: &'static str,
    },
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let coordinator = &mut config.coordinator;

        if let Some(ms) = parse_positive::<u64, _>(&lookup, "AC_ENDORSEMENT_TIMEOUT_MS")? {
            coordinator.endorsement_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_positive::<u64, _>(&lookup, "AC_FINALITY_TIMEOUT_MS")? {
            coordinator.finality_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_positive::<u32, _>(&lookup, "AC_ARBITER_MAX_ATTEMPTS")? {
            coordinator.arbiter_retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_positive::<u64, _>(&lookup, "AC_ARBITER_BACKOFF_MS")? {
            let backoff = Duration::from_millis(ms);
            coordinator.arbiter_retry.initial_backoff = backoff;
            coordinator.arbiter_retry.max_backoff =
                coordinator.arbiter_retry.max_backoff.max(backoff);
        }
        if let Some(filter) = lookup("AC_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        Ok(config)
    }
}

fn parse_positive<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value = raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.clone(),
        expected: "positive integer",
    })?;
    if value == T::default() {
        return Err(ConfigError::Zero { key });
    }
    Ok(Some(value))
}
