//! Correlation keys and request/response envelopes.
//!
//! A request envelope wraps opaque content together with a 16-byte
//! correlation key; the matching response carries the same key back. The
//! key is 8 random bytes plus 8 bytes derived from the creation time,
//! which makes accidental collision across process restarts negligible.
//! It is not a security token.

use crate::Message;
use std::fmt;

/// Opaque value pairing a request with its eventual response.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey([u8; 16]);

impl CorrelationKey {
    /// Compose a key from a random nonce and a timestamp-derived value.
    pub fn from_parts(nonce: u64, timestamp_nanos: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&nonce.to_le_bytes());
        bytes[8..].copy_from_slice(&timestamp_nanos.to_le_bytes());
        Self(bytes)
    }

    /// Reconstruct a key from its raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationKey(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// A request in flight: opaque content tagged with its correlation key.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Key the response must carry back.
    pub key: CorrelationKey,
    /// Opaque request content; the discriminator of the concrete type
    /// selects the inbound handler on the receiving side.
    pub content: Message,
}

/// A response paired to an earlier request by its key.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Key copied from the request envelope.
    pub key: CorrelationKey,
    /// Opaque response content.
    pub content: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_parts_is_stable() {
        let a = CorrelationKey::from_parts(7, 99);
        let b = CorrelationKey::from_parts(7, 99);
        assert_eq!(a, b);
        assert_ne!(a, CorrelationKey::from_parts(8, 99));
        assert_ne!(a, CorrelationKey::from_parts(7, 100));
    }

    #[test]
    fn test_key_bytes_roundtrip() {
        let key = CorrelationKey::from_parts(0x0102030405060708, 42);
        let copy = CorrelationKey::from_bytes(*key.as_bytes());
        assert_eq!(key, copy);
    }

    #[test]
    fn test_debug_is_hex() {
        let key = CorrelationKey::from_bytes([0xab; 16]);
        let text = format!("{key:?}");
        assert!(text.contains("abababab"));
    }
}
