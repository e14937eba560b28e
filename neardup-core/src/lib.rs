//! Neardup Core - Near-duplicate image detection
//!
//! This crate computes perceptual fingerprints for uploaded images and decides
//! whether a new image is a near-duplicate of something already stored. It is
//! the single shared implementation behind every upload surface: the image
//! service's accept path, batch uploads, and the browser pre-check.
//!
//! # Features
//!
//! - 64-bit perceptual fingerprints (structural mean hash + colour signature)
//! - Deterministic byte-sampled fallback when an image cannot be decoded
//! - Bounded decoding (byte ceiling, dimension and allocation limits, timeout)
//! - Thresholded Hamming-distance decision with first-match short-circuit
//! - Explicit handling of fallback fingerprints via [`FallbackPolicy`]
//!
//! # Example
//!
//! ```no_run
//! use neardup_core::{compute_fingerprint, is_near_duplicate, Threshold};
//!
//! # fn example() -> neardup_core::Result<()> {
//! let stored = compute_fingerprint(&std::fs::read("a.png").unwrap())?;
//! let existing = vec![(stored, "imgA")];
//!
//! let candidate = compute_fingerprint(&std::fs::read("a-reencoded.jpg").unwrap())?;
//! if let Some(id) = is_near_duplicate(&candidate, existing, Threshold::new(3)?) {
//!     println!("duplicate of {id}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod candidates;
pub mod config;
pub mod detector;
pub mod distance;
pub mod error;
pub mod fingerprint;
pub mod gate;

// Re-export main types for convenience
pub use candidates::{CandidateSource, FingerprintRecord, MemoryCandidates};
pub use config::DetectorConfig;
pub use detector::{
    is_near_duplicate, Candidate, DuplicateDetector, FallbackPolicy, Match, Threshold,
    DEFAULT_THRESHOLD, MAX_THRESHOLD,
};
pub use distance::hamming_distance;
pub use error::{NeardupError, Result};
pub use fingerprint::{
    compute_fingerprint, is_supported_format, FallbackReason, Fingerprint, FingerprintHasher,
    FingerprintKind, Fingerprinted, HasherLimits, PERCEPTUAL_HASH_BITS, PERCEPTUAL_HEX_LEN,
};
pub use gate::{has_image_extension, BatchReport, DuplicateOf, RejectReason, Upload, UploadGate, Verdict};
