#![no_main]

//! Fuzz target for fingerprint computation
//!
//! Arbitrary bytes must never panic: non-empty input always yields either a
//! perceptual or a fallback fingerprint.
//!
//! Run with: cargo +nightly fuzz run fuzz_fingerprint

use libfuzzer_sys::fuzz_target;
use neardup_core::{FingerprintHasher, HasherLimits};

fuzz_target!(|data: &[u8]| {
    // Keep decoder allocations small so the fuzzer explores parsing, not RAM
    let hasher = FingerprintHasher::new(HasherLimits {
        max_dimension: 1024,
        max_alloc_bytes: 16 * 1024 * 1024,
        ..HasherLimits::default()
    });

    match hasher.fingerprint_detailed(data) {
        Ok(result) => {
            assert_eq!(
                result.fingerprint.is_fallback(),
                result.fallback_reason.is_some()
            );
        }
        Err(_) => assert!(data.is_empty()),
    }
});
