//! Errors - エラー型と分類
//!
//! - `PublishError`: enqueue 時の失敗（store 到達不可 / serialize 失敗）
//! - `CorruptEnvelopeError`: pop した item が decode できない
//! - `CallbackError`: callback 自身の失敗
//! - `StoreError`: store の I/O 失敗（core 内ではリトライしない）
//! - `ConsumeError`: consume ループを終了させるエラー

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Envelope <-> bytes conversion failure.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] BoxError),

    #[error("failed to decode envelope: {0}")]
    Decode(#[source] BoxError),
}

/// Failure talking to the blocking-list store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store command failed: {0}")]
    Command(String),

    #[error("store closed")]
    Closed,
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Enqueue failed; nothing was written.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A popped item could not be decoded. It is already gone from the store.
#[derive(Debug, Error)]
#[error("corrupt envelope ({} bytes): {source}", raw.len())]
pub struct CorruptEnvelopeError {
    pub raw: Vec<u8>,
    #[source]
    pub source: CodecError,
}

impl CorruptEnvelopeError {
    /// Raw payload for forensic logging.
    pub fn raw_lossy(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

/// CallbackError は callback が返す失敗
#[derive(Debug)]
pub struct CallbackError {
    message: String,
    source: Option<BoxError>,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "callback failed: {}: {}", self.message, source),
            None => write!(f, "callback failed: {}", self.message),
        }
    }
}

impl std::error::Error for CallbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Errors that end the consume loop.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Callback(#[from] CallbackError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn callback_error_exposes_source() {
        let io = std::io::Error::other("disk full");
        let err = CallbackError::with_source("write report", io);
        assert!(err.to_string().contains("write report"));
        assert!(err.to_string().contains("disk full"));
        assert!(err.source().is_some());
        assert!(CallbackError::new("plain").source().is_none());
    }

    #[test]
    fn corrupt_envelope_keeps_raw_bytes() {
        let err = CorruptEnvelopeError {
            raw: b"not json".to_vec(),
            source: CodecError::Decode("expected value".into()),
        };
        assert_eq!(err.raw_lossy(), "not json");
        assert!(err.to_string().contains("8 bytes"));
    }

    #[test]
    fn publish_error_is_transparent_over_store_error() {
        let err = PublishError::from(StoreError::Unavailable("connection refused".into()));
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }
}
