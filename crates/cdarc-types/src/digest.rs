use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The only digest algorithm blobs are addressed with.
pub const SHA256: &str = "sha256";

/// Content digest of a blob.
///
/// A `Digest` is the SHA-256 hash of a blob's stored bytes. Identical content
/// always produces the same `Digest`, which is what makes the blob store
/// deduplicating. The textual form is the OCI one: `sha256:<64 hex chars>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Create a `Digest` from a pre-computed SHA-256 hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Algorithm name, always `sha256`.
    pub fn algorithm(&self) -> &'static str {
        SHA256
    }

    /// Hex-encoded hash without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 12 characters), for log output.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Parse a bare hex string (no algorithm prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl FromStr for Digest {
    type Err = TypeError;

    /// Parse the `algorithm:hex` form. A bare hex string is accepted as SHA-256.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((SHA256, hex)) => Self::from_hex(hex),
            Some((other, _)) => Err(TypeError::UnsupportedAlgorithm(other.to_string())),
            None => Self::from_hex(s),
        }
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", SHA256, self.to_hex())
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Size, media type and digest of a blob, as recorded when it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn display_has_algorithm_prefix() {
        let d = Digest::from_hex(EMPTY_SHA256).unwrap();
        assert_eq!(d.to_string(), format!("sha256:{EMPTY_SHA256}"));
    }

    #[test]
    fn parse_prefixed_and_bare() {
        let prefixed: Digest = format!("sha256:{EMPTY_SHA256}").parse().unwrap();
        let bare: Digest = EMPTY_SHA256.parse().unwrap();
        assert_eq!(prefixed, bare);
    }

    #[test]
    fn parse_rejects_other_algorithms() {
        let err = format!("sha512:{EMPTY_SHA256}").parse::<Digest>().unwrap_err();
        assert_eq!(err, TypeError::UnsupportedAlgorithm("sha512".into()));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = "abcd".parse::<Digest>().unwrap_err();
        assert!(matches!(err, TypeError::InvalidLength { expected: 32, actual: 2 }));
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!(matches!(
            "sha256:zz".parse::<Digest>(),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn short_hex_is_12_chars() {
        let d = Digest::from_hash([0xab; 32]);
        assert_eq!(d.short_hex(), "abababababab");
    }

    #[test]
    fn serializes_as_string() {
        let d = Digest::from_hex(EMPTY_SHA256).unwrap();
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"sha256:{EMPTY_SHA256}\""));
        let parsed: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, d);
    }
}
