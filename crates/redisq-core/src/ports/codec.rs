//! EnvelopeCodec port - envelope と bytes の相互変換
//!
//! core が要求するのは round-trip の忠実性だけです。
//! 既定の実装は serde_json（`JsonCodec`）。

use crate::domain::{CodecError, TaskEnvelope};

/// Converts envelopes to the opaque form stored in the list, and back.
pub trait EnvelopeCodec: Send + Sync {
    fn encode(&self, envelope: &TaskEnvelope) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, raw: &[u8]) -> Result<TaskEnvelope, CodecError>;
}

/// JSON text encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EnvelopeCodec for JsonCodec {
    fn encode(&self, envelope: &TaskEnvelope) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(envelope).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode(&self, raw: &[u8]) -> Result<TaskEnvelope, CodecError> {
        serde_json::from_slice(raw).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
