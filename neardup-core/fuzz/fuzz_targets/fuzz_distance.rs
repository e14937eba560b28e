#![no_main]

//! Fuzz target for stored fingerprint parsing and distance
//!
//! Run with: cargo +nightly fuzz run fuzz_distance

use libfuzzer_sys::fuzz_target;
use neardup_core::{hamming_distance, Fingerprint};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (a, b) = text.split_once('|').unwrap_or((text.as_ref(), ""));

    // Distance is total and symmetric for any pair of strings
    assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
    assert_eq!(hamming_distance(a, a), 0);

    if let (Ok(fa), Ok(fb)) = (Fingerprint::from_hex(a), Fingerprint::from_hex(b)) {
        assert_eq!(fa.distance(&fb), fb.distance(&fa));
    }
});
