//! Typed queue configuration.
//!
//! Built in code with [`QueueConfig::new`] + `with_*`, or loaded once at startup from
//! environment variables with [`QueueConfig::from_env`] (fails fast on bad values).

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_QUEUE_KEY: &str = "REDISQ_QUEUE_KEY";
pub const ENV_TIMEOUT_SECS: &str = "REDISQ_TIMEOUT_SECS";
pub const ENV_MAX_DELIVERY: &str = "REDISQ_MAX_DELIVERY";
pub const ENV_CALLBACK_ERRORS: &str = "REDISQ_CALLBACK_ERRORS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// 1 = no retry.
pub const DEFAULT_MAX_DELIVERY: u32 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// What the consumer does when the callback itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackErrorPolicy {
    /// Log at error level and treat the delivery as acknowledged.
    #[default]
    Ack,

    /// Stop the consume loop and return the error to the caller.
    Propagate,
}

impl FromStr for CallbackErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ack" => Ok(CallbackErrorPolicy::Ack),
            "propagate" => Ok(CallbackErrorPolicy::Propagate),
            other => Err(format!("expected `ack` or `propagate`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    queue_key: String,
    timeout: Duration,
    max_delivery: u32,
    callback_error_policy: CallbackErrorPolicy,
}

impl QueueConfig {
    pub fn new(queue_key: impl Into<String>) -> Self {
        Self {
            queue_key: queue_key.into(),
            timeout: DEFAULT_TIMEOUT,
            max_delivery: DEFAULT_MAX_DELIVERY,
            callback_error_policy: CallbackErrorPolicy::default(),
        }
    }

    /// Blocking-pop timeout; also the upper bound on shutdown latency while idle.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_delivery(mut self, max_delivery: u32) -> Self {
        self.max_delivery = max_delivery;
        self
    }

    pub fn with_callback_error_policy(mut self, policy: CallbackErrorPolicy) -> Self {
        self.callback_error_policy = policy;
        self
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_delivery(&self) -> u32 {
        self.max_delivery
    }

    pub fn callback_error_policy(&self) -> CallbackErrorPolicy {
        self.callback_error_policy
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: ENV_QUEUE_KEY,
                value: self.queue_key.clone(),
                reason: "queue key must not be empty".to_string(),
            });
        }
        if self.max_delivery == 0 {
            return Err(ConfigError::Invalid {
                name: ENV_MAX_DELIVERY,
                value: "0".to_string(),
                reason: "at least one delivery is required".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` (or export the vars) before this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`QueueConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let queue_key = lookup(ENV_QUEUE_KEY).ok_or(ConfigError::Missing(ENV_QUEUE_KEY))?;
        let mut config = Self::new(queue_key);

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: f64 = parse_var(ENV_TIMEOUT_SECS, &raw)?;
            if !secs.is_finite() || secs < 0.0 {
                return Err(ConfigError::Invalid {
                    name: ENV_TIMEOUT_SECS,
                    value: raw,
                    reason: "expected a non-negative number of seconds".to_string(),
                });
            }
            config = config.with_timeout(Duration::from_secs_f64(secs));
        }
        if let Some(raw) = lookup(ENV_MAX_DELIVERY) {
            config = config.with_max_delivery(parse_var(ENV_MAX_DELIVERY, &raw)?);
        }
        if let Some(raw) = lookup(ENV_CALLBACK_ERRORS) {
            config = config.with_callback_error_policy(parse_var(ENV_CALLBACK_ERRORS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
