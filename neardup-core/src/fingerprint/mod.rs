//! Image fingerprints.
//!
//! A fingerprint is a short lowercase hex digest of an image. Under normal
//! operation it is a 64-bit perceptual digest, so visually similar images end
//! up a few bits apart. When the bytes cannot be decoded (or decoding would
//! exceed the configured ceilings) a shorter byte-sampled digest is produced
//! instead and marked as a fallback.
//!
//! # Components
//!
//! - **Perceptual hashing**: structural mean hash plus a coarse colour
//!   signature, see [`perceptual`].
//! - **Fallback hashing**: deterministic digest of the leading bytes, see
//!   [`fallback`].

pub mod fallback;
pub mod perceptual;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::distance::hamming_distance;
use crate::error::{NeardupError, Result};

pub use fallback::{fallback_fingerprint, FALLBACK_HEX_LEN, FALLBACK_SAMPLE_BYTES};
pub use perceptual::{
    compute_fingerprint, is_supported_format, FingerprintHasher, HasherLimits,
    PERCEPTUAL_HASH_BITS, PERCEPTUAL_HASH_SIZE, PERCEPTUAL_HEX_LEN,
};

/// How a fingerprint was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    /// Computed from decoded pixels.
    Perceptual,
    /// Computed from raw bytes after the pixel path was abandoned.
    /// Not perceptually meaningful.
    Fallback,
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perceptual => write!(f, "perceptual"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Why the pixel path was abandoned in favour of a fallback fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Input exceeded the configured byte ceiling; no decode was attempted.
    TooLarge,
    /// Magic bytes did not match any known image format.
    UnrecognizedFormat,
    /// Format is known but not one of PNG, JPEG, GIF or WebP.
    UnsupportedFormat,
    /// Decoder refused the image because of dimension or allocation limits.
    LimitsExceeded,
    /// Decoder failed on corrupt or truncated data.
    DecodeFailed,
    /// Decoding did not finish within the configured timeout.
    TimedOut,
}

impl FallbackReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::TooLarge => "input exceeds the configured size ceiling",
            Self::UnrecognizedFormat => "unrecognized image format",
            Self::UnsupportedFormat => "unsupported image format",
            Self::LimitsExceeded => "image exceeds decoder limits",
            Self::DecodeFailed => "image could not be decoded",
            Self::TimedOut => "image decoding timed out",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A computed image fingerprint.
///
/// Deserialization goes through [`Fingerprint::from_hex_with_kind`], so a
/// stored record can never carry a non-hex hash or a perceptual tag on a
/// digest of the wrong width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredFingerprint")]
pub struct Fingerprint {
    hash: String,
    kind: FingerprintKind,
}

/// Wire shape of a fingerprint. `kind` is absent in records written before
/// kinds were tracked; it is then inferred from the length.
#[derive(Deserialize)]
struct StoredFingerprint {
    hash: String,
    #[serde(default)]
    kind: Option<FingerprintKind>,
}

impl TryFrom<StoredFingerprint> for Fingerprint {
    type Error = NeardupError;

    fn try_from(stored: StoredFingerprint) -> Result<Self> {
        match stored.kind {
            Some(kind) => Self::from_hex_with_kind(&stored.hash, kind),
            None => Self::from_hex(&stored.hash),
        }
    }
}

impl Fingerprint {
    /// Build a perceptual fingerprint from its raw digest bytes.
    pub fn perceptual(bytes: [u8; PERCEPTUAL_HASH_SIZE]) -> Self {
        Self {
            hash: hex::encode(bytes),
            kind: FingerprintKind::Perceptual,
        }
    }

    pub(crate) fn fallback_from_bytes(bytes: &[u8]) -> Self {
        Self {
            hash: hex::encode(bytes),
            kind: FingerprintKind::Fallback,
        }
    }

    /// Parse a stored hex fingerprint.
    ///
    /// The kind is inferred from the length: [`PERCEPTUAL_HEX_LEN`] characters
    /// is a perceptual digest, anything else is treated as a fallback.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let trimmed = hex_str.trim();
        if trimmed.is_empty() {
            return Err(NeardupError::InvalidFingerprint(
                "fingerprint is empty".into(),
            ));
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(NeardupError::InvalidFingerprint(format!(
                "non-hex character {bad:?} in {trimmed:?}"
            )));
        }

        let kind = if trimmed.len() == PERCEPTUAL_HEX_LEN {
            FingerprintKind::Perceptual
        } else {
            FingerprintKind::Fallback
        };

        Ok(Self {
            hash: trimmed.to_ascii_lowercase(),
            kind,
        })
    }

    /// Parse a stored hex fingerprint with an explicitly recorded kind.
    ///
    /// A perceptual fingerprint must be exactly [`PERCEPTUAL_HEX_LEN`]
    /// characters.
    pub fn from_hex_with_kind(hex_str: &str, kind: FingerprintKind) -> Result<Self> {
        let mut fingerprint = Self::from_hex(hex_str)?;
        if kind == FingerprintKind::Perceptual && fingerprint.hash.len() != PERCEPTUAL_HEX_LEN {
            return Err(NeardupError::InvalidFingerprint(format!(
                "perceptual fingerprint must be {PERCEPTUAL_HEX_LEN} hex characters, got {}",
                fingerprint.hash.len()
            )));
        }
        fingerprint.kind = kind;
        Ok(fingerprint)
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }

    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == FingerprintKind::Fallback
    }

    /// Number of bits carried by the digest (4 per hex character).
    pub fn bit_len(&self) -> u32 {
        (self.hash.len() * 4) as u32
    }

    /// Hamming distance to another fingerprint, see [`hamming_distance`].
    pub fn distance(&self, other: &Self) -> u32 {
        hamming_distance(&self.hash, &other.hash)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash)
    }
}

/// A fingerprint together with the reason it fell back, if it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprinted {
    pub fingerprint: Fingerprint,
    pub fallback_reason: Option<FallbackReason>,
}

impl Fingerprinted {
    pub(crate) fn perceptual(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            fallback_reason: None,
        }
    }

    pub(crate) fn fallback(fingerprint: Fingerprint, reason: FallbackReason) -> Self {
        Self {
            fingerprint,
            fallback_reason: Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex_infers_kind_from_length() {
        let perceptual = Fingerprint::from_hex("deadbeefcafebabe").unwrap();
        assert_eq!(perceptual.kind(), FingerprintKind::Perceptual);
        assert!(!perceptual.is_fallback());

        let fallback = Fingerprint::from_hex("0123456789ab").unwrap();
        assert_eq!(fallback.kind(), FingerprintKind::Fallback);
        assert!(fallback.is_fallback());
    }

    #[test]
    fn test_from_hex_normalizes_case_and_whitespace() {
        let fp = Fingerprint::from_hex("  DEADBEEFCAFEBABE\n").unwrap();
        assert_eq!(fp.as_str(), "deadbeefcafebabe");
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(
            Fingerprint::from_hex(""),
            Err(NeardupError::InvalidFingerprint(_))
        ));
        assert!(matches!(
            Fingerprint::from_hex("not-a-hash"),
            Err(NeardupError::InvalidFingerprint(_))
        ));
    }

    #[test]
    fn test_from_hex_with_kind_overrides_inference() {
        let fp =
            Fingerprint::from_hex_with_kind("deadbeefcafebabe", FingerprintKind::Fallback).unwrap();
        assert!(fp.is_fallback());
    }

    #[test]
    fn test_perceptual_constructor() {
        let fp = Fingerprint::perceptual([0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(fp.to_string(), "deadbeefcafebabe");
        assert_eq!(fp.bit_len(), PERCEPTUAL_HASH_BITS);
        assert_eq!(fp.kind(), FingerprintKind::Perceptual);
    }

    #[test]
    fn test_serde_shape() {
        let fp = Fingerprint::from_hex("0123456789ab").unwrap();
        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["hash"], "0123456789ab");
        assert_eq!(json["kind"], "fallback");

        let back: Fingerprint = serde_json::from_value(json).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_deserialize_validates_hash() {
        let garbage = r#"{"hash":"ZZZZ-not-hex!!!!","kind":"perceptual"}"#;
        assert!(serde_json::from_str::<Fingerprint>(garbage).is_err());

        let wrong_width = r#"{"hash":"0123456789ab","kind":"perceptual"}"#;
        assert!(serde_json::from_str::<Fingerprint>(wrong_width).is_err());

        let upper = r#"{"hash":"DEADBEEFCAFEBABE","kind":"perceptual"}"#;
        let fp: Fingerprint = serde_json::from_str(upper).unwrap();
        assert_eq!(fp.as_str(), "deadbeefcafebabe");
    }

    #[test]
    fn test_deserialize_infers_missing_kind() {
        let fp: Fingerprint = serde_json::from_str(r#"{"hash":"0123456789ab"}"#).unwrap();
        assert!(fp.is_fallback());

        let fp: Fingerprint = serde_json::from_str(r#"{"hash":"deadbeefcafebabe"}"#).unwrap();
        assert_eq!(fp.kind(), FingerprintKind::Perceptual);
    }
}
