//! Hamming distance between hex fingerprints.

/// Compute the Hamming distance between two hex fingerprint strings.
///
/// Over the overlapping prefix each pair of hex digits contributes the number
/// of differing bits in their nibbles; a pair where either side is not a hex
/// digit contributes 1 if the characters differ. Any non-overlapping suffix
/// adds one per character of length difference, so fingerprints of different
/// lengths still get a total, symmetric distance.
///
/// The two terms use different units: the prefix counts bits (up to 4 per
/// character) while the suffix counts characters. `d("ffff", "")` is 4 but
/// `d("ffff", "0000")` is 16. Only [`FallbackPolicy::Mixed`] ever compares
/// fingerprints of different lengths.
///
/// [`FallbackPolicy::Mixed`]: crate::detector::FallbackPolicy::Mixed
///
/// Comparison is case-insensitive.
pub fn hamming_distance(a: &str, b: &str) -> u32 {
    let prefix: u32 = a
        .chars()
        .zip(b.chars())
        .map(|(x, y)| match (x.to_digit(16), y.to_digit(16)) {
            (Some(p), Some(q)) => (p ^ q).count_ones(),
            _ => u32::from(x != y),
        })
        .sum();

    let length_penalty = a.chars().count().abs_diff(b.chars().count()) as u32;

    prefix + length_penalty
}
