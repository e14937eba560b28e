//! Byte-sampled fallback fingerprints.

use sha3::{Digest, Sha3_256};

use super::Fingerprint;

/// Number of leading input bytes sampled into a fallback digest.
pub const FALLBACK_SAMPLE_BYTES: usize = 64 * 1024;

/// Fallback digest size in bytes. Deliberately shorter than a perceptual
/// digest so the two kinds can be told apart by length alone.
const FALLBACK_HASH_SIZE: usize = 6;

/// Length of a fallback fingerprint in hex characters.
pub const FALLBACK_HEX_LEN: usize = FALLBACK_HASH_SIZE * 2;

/// Derive a fallback fingerprint from raw bytes.
///
/// SHA3-256 over the first [`FALLBACK_SAMPLE_BYTES`] bytes and the total
/// input length, truncated to 48 bits.
pub fn fallback_fingerprint(data: &[u8]) -> Fingerprint {
    let sample = &data[..data.len().min(FALLBACK_SAMPLE_BYTES)];

    let mut hasher = Sha3_256::new();
    hasher.update(sample);
    hasher.update((data.len() as u64).to_le_bytes());
    let digest = hasher.finalize();

    Fingerprint::fallback_from_bytes(&digest[..FALLBACK_HASH_SIZE])
}
