//! SHA-256 hash type for meridian

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// SHA-256 hash (32 bytes).
///
/// The all-zero hash is the *empty* hash and means "no such hash"; it is
/// never a valid block identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(#[serde(with = "hex_bytes")] pub [u8; 32]);

/// Error parsing a hash from its hex form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HexError {
    /// The string contained non-hex characters.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    /// Decoded byte length was not 32.
    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl Hash {
    /// Empty (all-zero) hash constant.
    pub const EMPTY: Self = Self([0u8; 32]);

    /// Compute SHA-256 hash of data.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the all-zero hash.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Wire text form: 0x-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| HexError::InvalidHex(s.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| HexError::InvalidLength(b.len()))?;
        Ok(Self(arr))
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Hex serialization helper: hex string for human-readable formats,
/// fixed-width tuple for binary ones.
mod hex_bytes {
    use serde::de::{SeqAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeTuple;

        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            // serialize_tuple matches deserialize_tuple (no length prefix)
            let mut tuple = serializer.serialize_tuple(32)?;
            for byte in bytes {
                tuple.serialize_element(byte)?;
            }
            tuple.end()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            let stripped = s.strip_prefix("0x").unwrap_or(&s);
            let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
            bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("invalid hash length"))
        } else {
            struct ArrayVisitor;

            impl<'de> Visitor<'de> for ArrayVisitor {
                type Value = [u8; 32];

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    formatter.write_str("32 bytes")
                }

                fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                where
                    A: SeqAccess<'de>,
                {
                    let mut arr = [0u8; 32];
                    for (i, byte) in arr.iter_mut().enumerate() {
                        *byte = seq
                            .next_element()?
                            .ok_or_else(|| serde::de::Error::invalid_length(i, &self))?;
                    }
                    Ok(arr)
                }
            }

            deserializer.deserialize_tuple(32, ArrayVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_compute() {
        let hash = Hash::compute(b"hello world");
        assert_ne!(hash, Hash::EMPTY);
        assert!(!hash.is_empty());
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(Hash::compute(b"test data"), Hash::compute(b"test data"));
    }

    #[test]
    fn test_empty_hash() {
        assert!(Hash::EMPTY.is_empty());
        assert!(Hash::from_bytes([0u8; 32]).is_empty());
        assert!(!Hash::from_bytes([1u8; 32]).is_empty());
    }

    #[test]
    fn test_hex_roundtrip() {
        let hash = Hash::compute(b"roundtrip");
        let hex = hash.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(Hash::from_hex(&hex).expect("parse"), hash);
    }

    #[test]
    fn test_from_hex_without_prefix() {
        let hash = Hash::compute(b"bare");
        let bare = hex::encode(hash.0);
        assert_eq!(Hash::from_hex(&bare).expect("parse"), hash);
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(
            Hash::from_hex("0xzz"),
            Err(HexError::InvalidHex(_))
        ));
        assert!(matches!(
            Hash::from_hex("0xabcd"),
            Err(HexError::InvalidLength(2))
        ));
    }

    #[test]
    fn test_binary_serde_roundtrip() {
        let hash = Hash::compute(b"wire");
        let encoded = bincode::serialize(&hash).expect("encode");
        // Fixed width: no length prefix on the byte array.
        assert_eq!(encoded.len(), 32);
        let decoded: Hash = bincode::deserialize(&encoded).expect("decode");
        assert_eq!(decoded, hash);
    }
}
