//! Serialization strategies for session values.
//!
//! Both strategies encode the full value mapping, entry wrappers included,
//! so the encode and decode sides must be configured with the same
//! strategy.

use crate::error::{Error, Result};
use crate::value::SessionValues;

/// Converts a session value mapping to and from a byte payload.
pub trait SessionSerializer: std::fmt::Debug + Send + Sync {
    /// Encode the value mapping into a byte payload.
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>>;

    /// Decode a byte payload into a value mapping.
    fn deserialize(&self, bytes: &[u8]) -> Result<SessionValues>;
}

/// Human-readable JSON strategy.
///
/// Useful when cache records need to be inspected or consumed by other
/// tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl SessionSerializer for JsonSerializer {
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>> {
        serde_json::to_vec(values).map_err(|e| Error::Encode(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<SessionValues> {
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Compact MessagePack strategy. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackSerializer;

impl SessionSerializer for MessagePackSerializer {
    fn serialize(&self, values: &SessionValues) -> Result<Vec<u8>> {
        rmp_serde::to_vec(values).map_err(|e| Error::Encode(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<SessionValues> {
        rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
    }
}
