//! WebAssembly bindings for the near-duplicate pre-check.
//!
//! The portal fingerprints a file in the browser and compares it with the
//! service's hash listing before uploading, using the same algorithm as the
//! server so both sides agree on what counts as a duplicate.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use neardup_core::{
    DuplicateDetector, FallbackReason, Fingerprint, FingerprintHasher, FingerprintKind, Threshold,
};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Fingerprint of one file.
#[derive(Debug, Serialize, Deserialize)]
pub struct FingerprintResult {
    pub hash: String,
    pub kind: FingerprintKind,
    pub fallback_reason: Option<FallbackReason>,
}

/// Outcome of a pre-check against the hash listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct DuplicateResult {
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
}

/// One entry of the service's hash listing.
#[derive(Debug, Deserialize)]
struct HashEntry {
    uuid: String,
    hash: String,
    #[serde(default)]
    kind: Option<FingerprintKind>,
}

#[derive(Serialize)]
struct ErrorResult {
    error: String,
}

fn to_json<T: Serialize>(result: Result<T, String>) -> String {
    let serialized = match result {
        Ok(value) => serde_json::to_string(&value),
        Err(error) => serde_json::to_string(&ErrorResult { error }),
    };
    serialized.unwrap_or_else(|e| format!(r#"{{"error":"Serialization error: {}"}}"#, e))
}

/// Fingerprint a file's bytes.
///
/// # Returns
/// JSON `{hash, kind, fallback_reason}` or `{error}`.
#[wasm_bindgen]
pub fn fingerprint_wasm(file_bytes: &[u8]) -> String {
    to_json(fingerprint_internal(file_bytes))
}

fn fingerprint_internal(file_bytes: &[u8]) -> Result<FingerprintResult, String> {
    let result = FingerprintHasher::default()
        .fingerprint_detailed(file_bytes)
        .map_err(|e| e.to_string())?;

    Ok(FingerprintResult {
        hash: result.fingerprint.as_str().to_string(),
        kind: result.fingerprint.kind(),
        fallback_reason: result.fallback_reason,
    })
}

/// Hamming distance between two hex fingerprints, with the length penalty.
#[wasm_bindgen]
pub fn hamming_distance_wasm(a: &str, b: &str) -> u32 {
    neardup_core::hamming_distance(a, b)
}

/// Check a candidate fingerprint against the hash listing.
///
/// # Arguments
/// * `candidate_hex` - Fingerprint returned by [`fingerprint_wasm`]
/// * `existing_json` - JSON array of `{uuid, hash, kind?}` entries
/// * `threshold` - Maximum distance in bits that counts as a duplicate
///
/// # Returns
/// JSON `{duplicate, uuid, distance}` or `{error}`.
#[wasm_bindgen]
pub fn is_near_duplicate_wasm(candidate_hex: &str, existing_json: &str, threshold: u32) -> String {
    to_json(near_duplicate_internal(candidate_hex, existing_json, threshold))
}

fn near_duplicate_internal(
    candidate_hex: &str,
    existing_json: &str,
    threshold: u32,
) -> Result<DuplicateResult, String> {
    let threshold = Threshold::new(threshold).map_err(|e| e.to_string())?;
    let candidate = Fingerprint::from_hex(candidate_hex).map_err(|e| e.to_string())?;

    let entries: Vec<HashEntry> = serde_json::from_str(existing_json)
        .map_err(|e| format!("Failed to parse hash listing: {}", e))?;

    let existing = entries
        .into_iter()
        .map(|entry| {
            let fingerprint = match entry.kind {
                Some(kind) => Fingerprint::from_hex_with_kind(&entry.hash, kind),
                None => Fingerprint::from_hex(&entry.hash),
            }
            .map_err(|e| format!("Entry {}: {}", entry.uuid, e))?;
            Ok((fingerprint, entry.uuid))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let found = DuplicateDetector::new(threshold).find_match(&candidate, existing);
    Ok(match found {
        Some(m) => DuplicateResult {
            duplicate: true,
            uuid: Some(m.identity),
            distance: Some(m.distance),
        },
        None => DuplicateResult {
            duplicate: false,
            uuid: None,
            distance: None,
        },
    })
}

/// Get the library version.
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use serde_json::Value;
    use std::io::Cursor;

    fn red_png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb([255, 0, 0])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_fingerprint_png() {
        let json: Value = serde_json::from_str(&fingerprint_wasm(&red_png())).unwrap();
        assert_eq!(json["kind"], "perceptual");
        assert_eq!(json["hash"].as_str().unwrap().len(), 16);
        assert!(json["fallback_reason"].is_null());
    }

    #[test]
    fn test_fingerprint_empty_is_error() {
        let json: Value = serde_json::from_str(&fingerprint_wasm(&[])).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Invalid input"));
    }

    #[test]
    fn test_hamming_distance_wasm() {
        assert_eq!(hamming_distance_wasm("abcd", "abcdef"), 2);
        assert_eq!(hamming_distance_wasm("ff", "00"), 8);
    }

    #[test]
    fn test_near_duplicate_found() {
        let fp: Value = serde_json::from_str(&fingerprint_wasm(&red_png())).unwrap();
        let hash = fp["hash"].as_str().unwrap();
        let listing = format!(
            r#"[{{"uuid":"other","hash":"0000000000000000"}},{{"uuid":"imgA","hash":"{hash}","filename":"a.png"}}]"#
        );

        let json: Value =
            serde_json::from_str(&is_near_duplicate_wasm(hash, &listing, 3)).unwrap();
        assert_eq!(json["duplicate"], true);
        assert_eq!(json["uuid"], "imgA");
        assert_eq!(json["distance"], 0);
    }

    #[test]
    fn test_near_duplicate_not_found() {
        let listing = r#"[{"uuid":"imgA","hash":"ffffffffffffffff"}]"#;
        let json: Value =
            serde_json::from_str(&is_near_duplicate_wasm("0000000000000000", listing, 5)).unwrap();
        assert_eq!(json["duplicate"], false);
        assert!(json.get("uuid").is_none());
    }

    #[test]
    fn test_near_duplicate_errors() {
        let json: Value =
            serde_json::from_str(&is_near_duplicate_wasm("0000000000000000", "[]", 65)).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Misconfigured threshold"));

        let json: Value =
            serde_json::from_str(&is_near_duplicate_wasm("0000000000000000", "{", 5)).unwrap();
        assert!(json["error"].as_str().unwrap().contains("hash listing"));

        let listing = r#"[{"uuid":"bad","hash":"xyz"}]"#;
        let json: Value =
            serde_json::from_str(&is_near_duplicate_wasm("0000000000000000", listing, 5)).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("Entry bad"));
    }

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }
}
