//! Wire codecs for collection snapshots.
//!
//! A codec turns the full item sequence into bytes and back. The collection
//! never interprets the bytes itself, so the on-disk format is swappable per
//! collection via [`ListOptions`](crate::collection::ListOptions).

use crate::core::{ListError, Result, Value};

/// Encodes and decodes a full snapshot of a collection's items.
///
/// `decode` must reject malformed input with an error rather than return a
/// partial sequence; `encode(items)` followed by `decode` must reproduce
/// `items` exactly, order included.
pub trait Codec: Send + Sync {
    fn encode(&self, items: &[Value]) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>>;

    /// Short format name, used in stats and log lines.
    fn name(&self) -> &'static str;
}

/// Compact binary encoding via MessagePack. The default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn encode(&self, items: &[Value]) -> Result<Vec<u8>> {
        rmp_serde::to_vec(items)
            .map_err(|err| ListError::Serialization(format!("MessagePack encode failed: {}", err)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        rmp_serde::from_slice(bytes)
            .map_err(|err| ListError::Deserialization(format!("MessagePack decode failed: {}", err)))
    }

    fn name(&self) -> &'static str {
        "messagepack"
    }
}

/// Human-readable pretty-printed JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, items: &[Value]) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(items)
            .map_err(|err| ListError::Serialization(format!("JSON encode failed: {}", err)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>> {
        serde_json::from_slice(bytes)
            .map_err(|err| ListError::Deserialization(format!("JSON decode failed: {}", err)))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
