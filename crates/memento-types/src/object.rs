use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content-addressed identifier for any stored object.
///
/// Git repositories use 20-byte SHA-1 (or 32-byte SHA-256) object names; the
/// in-memory store uses 32-byte BLAKE3 digests. `ObjectId` carries either
/// width so the engine never cares which backend produced it. Identical
/// content always produces the same `ObjectId` within one backend.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    len: u8,
    bytes: [u8; 32],
}

impl ObjectId {
    /// Compute a BLAKE3 `ObjectId` from raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_hash(*blake3::hash(data).as_bytes())
    }

    /// Create an `ObjectId` from a pre-computed 32-byte hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self {
            len: 32,
            bytes: hash,
        }
    }

    /// Create an `ObjectId` from a 20- or 32-byte digest.
    pub fn from_digest(digest: &[u8]) -> Result<Self, TypeError> {
        if digest.len() != 20 && digest.len() != 32 {
            return Err(TypeError::InvalidLength(digest.len()));
        }
        let mut bytes = [0u8; 32];
        bytes[..digest.len()].copy_from_slice(digest);
        Ok(Self {
            len: digest.len() as u8,
            bytes,
        })
    }

    /// Returns `true` if every byte is zero (git's "no object").
    pub fn is_null(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// The digest bytes (20 or 32 of them).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    /// Parse from a hex string of 40 or 64 characters.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_digest(&bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_bytes_is_deterministic() {
        let id1 = ObjectId::from_bytes(b"hello world");
        let id2 = ObjectId::from_bytes(b"hello world");
        assert_eq!(id1, id2);
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(ObjectId::from_bytes(b"hello"), ObjectId::from_bytes(b"world"));
    }

    #[test]
    fn parses_git_sha1() {
        let id = ObjectId::from_hex("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap();
        assert_eq!(id.as_bytes().len(), 20);
        assert_eq!(id.to_hex(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
        assert_eq!(id.short_hex(), "4b825dc6");
    }

    #[test]
    fn rejects_odd_widths() {
        assert_eq!(ObjectId::from_hex("abcd"), Err(TypeError::InvalidLength(2)));
        assert!(matches!(ObjectId::from_hex("zz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn sha1_and_blake3_never_collide_by_width() {
        let short = ObjectId::from_digest(&[7u8; 20]).unwrap();
        let mut long = [0u8; 32];
        long[..20].copy_from_slice(&[7u8; 20]);
        assert_ne!(short, ObjectId::from_hash(long));
    }

    #[test]
    fn null_detection() {
        assert!(ObjectId::from_digest(&[0u8; 20]).unwrap().is_null());
        assert!(!ObjectId::from_bytes(b"x").is_null());
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = ObjectId::from_bytes(b"serde test");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    proptest! {
        #[test]
        fn hex_roundtrip_any_digest(bytes in proptest::collection::vec(any::<u8>(), 20)) {
            let id = ObjectId::from_digest(&bytes).unwrap();
            prop_assert_eq!(ObjectId::from_hex(&id.to_hex()).unwrap(), id);
        }
    }
}
