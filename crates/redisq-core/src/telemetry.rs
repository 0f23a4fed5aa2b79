//! tracing-subscriber setup for binaries.
//!
//! The library itself only emits `tracing` events; installing a subscriber is left to
//! the process that embeds it.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Error)]
#[error("failed to init tracing subscriber: {0}")]
pub struct TelemetryError(String);

/// `LOG_LEVEL` or "info".
pub fn log_level_from_env() -> String {
    std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| "info".to_string())
}

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails() {
        // 1 回目は他のテストが先に設定している可能性があるので結果は問わない
        let _ = init_tracing("debug");
        assert!(init_tracing("debug").is_err());
    }
}
