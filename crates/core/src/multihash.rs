//! SHA-256 multihashes, the content address of every block.

use crate::varint;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Multicodec identifier for SHA2-256.
pub const SHA2_256_CODE: u64 = 0x12;

/// Digest length of SHA2-256 in bytes.
pub const SHA2_256_LEN: usize = 32;

/// Raw length of a SHA2-256 multihash: two prefix bytes plus the digest.
pub const MULTIHASH_LEN: usize = 2 + SHA2_256_LEN;

/// A SHA2-256 multihash: `varint(0x12) || varint(32) || digest`.
///
/// The base-58 rendering of these 34 bytes is the block address used on the
/// wire and by callers.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Multihash([u8; MULTIHASH_LEN]);

impl Multihash {
    /// Hash a block.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);

        let mut raw = Vec::with_capacity(MULTIHASH_LEN);
        varint::encode_into(SHA2_256_CODE, &mut raw);
        varint::encode_into(digest.len() as u64, &mut raw);
        raw.extend_from_slice(&digest);

        let mut bytes = [0u8; MULTIHASH_LEN];
        bytes.copy_from_slice(&raw);
        Self(bytes)
    }

    /// Parse the raw binary form.
    ///
    /// Anything other than a 34-byte SHA2-256 multihash is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != MULTIHASH_LEN {
            return Err(Error::UnsupportedHash(format!(
                "expected {MULTIHASH_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let code = varint::decode(bytes, 0)?;
        let length = varint::decode(bytes, code.length)?;
        if code.value != SHA2_256_CODE || length.value != SHA2_256_LEN as u64 {
            return Err(Error::UnsupportedHash(format!(
                "function 0x{:x} with {} byte digest",
                code.value, length.value
            )));
        }
        let mut raw = [0u8; MULTIHASH_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Parse a base-58 address.
    pub fn from_base58(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| Error::UnsupportedHash(format!("{s}: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Render as a base-58 address.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Raw multihash bytes.
    pub fn as_bytes(&self) -> &[u8; MULTIHASH_LEN] {
        &self.0
    }

    /// The SHA-256 digest without the multihash prefix.
    pub fn digest(&self) -> &[u8] {
        &self.0[2..]
    }

    /// Check that `data` hashes to this address.
    pub fn verify(&self, data: &[u8]) -> Result<()> {
        let actual = Self::compute(data);
        if &actual != self {
            return Err(Error::HashMismatch {
                expected: self.to_base58(),
                actual: actual.to_base58(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({})", self.to_base58())
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl FromStr for Multihash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for Multihash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Multihash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_rendering() {
        let hash = Multihash::compute(b"abcd");
        assert_eq!(hash.as_bytes()[0], 0x12);
        assert_eq!(hash.as_bytes()[1], 0x20);
        assert_eq!(hash.digest(), Sha256::digest(b"abcd").as_slice());

        let address = hash.to_base58();
        assert!(address.starts_with("Qm"), "got {address}");
        assert_eq!(address.len(), 46);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(Multihash::compute(b"block"), Multihash::compute(b"block"));
    }

    #[test]
    fn test_single_bit_flip_changes_address() {
        let data = vec![0x55u8; 1024];
        let mut flipped = data.clone();
        flipped[512] ^= 0x01;
        assert_ne!(Multihash::compute(&data), Multihash::compute(&flipped));
    }

    #[test]
    fn test_base58_roundtrip() {
        let hash = Multihash::compute(b"roundtrip");
        let parsed: Multihash = hash.to_base58().parse().unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.to_string(), hash.to_base58());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let short = bs58::encode([0x12, 0x20, 0x01]).into_string();
        assert!(matches!(
            Multihash::from_base58(&short),
            Err(Error::UnsupportedHash(_))
        ));
    }

    #[test]
    fn test_rejects_other_functions() {
        let mut raw = [0u8; MULTIHASH_LEN];
        raw[0] = 0x13;
        raw[1] = 0x20;
        assert!(matches!(
            Multihash::from_bytes(&raw),
            Err(Error::UnsupportedHash(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_base58() {
        // 0, O, I and l are not in the alphabet
        assert!(Multihash::from_base58("Qm0OIl").is_err());
    }

    #[test]
    fn test_verify() {
        let hash = Multihash::compute(b"payload");
        hash.verify(b"payload").unwrap();
        match hash.verify(b"tampered") {
            Err(Error::HashMismatch { expected, actual }) => {
                assert_eq!(expected, hash.to_base58());
                assert_ne!(actual, expected);
            }
            other => panic!("expected hash mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_serde_as_string() {
        let hash = Multihash::compute(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_base58()));
        let decoded: Multihash = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, hash);
    }
}
