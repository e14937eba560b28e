//! Near-duplicate decision.
//!
//! An incoming fingerprint is a near-duplicate of a stored record when their
//! Hamming distance is at most the configured threshold. The scan is linear
//! and stops at the first qualifying record; there is no attempt to find the
//! closest one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::candidates::{CandidateSource, FingerprintRecord};
use crate::error::{NeardupError, Result};
use crate::fingerprint::{Fingerprint, FingerprintKind, PERCEPTUAL_HASH_BITS};

/// Largest accepted threshold: the perceptual digest width.
pub const MAX_THRESHOLD: u32 = PERCEPTUAL_HASH_BITS;

/// Above this many bits unrelated images match routinely.
const LOOSE_THRESHOLD: u32 = PERCEPTUAL_HASH_BITS / 2;

/// Default threshold (bits).
pub const DEFAULT_THRESHOLD: u32 = 5;

/// Validated near-duplicate threshold in bits. `0` means exact match only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Threshold(u32);

impl Threshold {
    pub fn new(value: u32) -> Result<Self> {
        if value > MAX_THRESHOLD {
            return Err(NeardupError::MisconfiguredThreshold {
                threshold: value,
                max: MAX_THRESHOLD,
            });
        }
        if value > LOOSE_THRESHOLD {
            warn!(
                threshold = value,
                loose = LOOSE_THRESHOLD,
                "Threshold above half the digest width; unrelated images will match"
            );
        }
        Ok(Self(value))
    }

    pub const fn exact() -> Self {
        Self(0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Threshold::new(value).map_err(serde::de::Error::custom)
    }
}

/// How fallback (byte-sampled) fingerprints take part in duplicate checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Perceptual fingerprints are compared only with perceptual ones.
    /// Fallbacks are compared only with fallbacks, and only an exact match
    /// counts.
    #[default]
    Segregate,
    /// Fallback fingerprints never match and are never matched.
    Exclude,
    /// Every pair is compared with the threshold regardless of kind.
    ///
    /// A perceptual digest (16 chars) against a fallback (12 chars) is
    /// scored in bits over the shared prefix plus one per missing character,
    /// so a shorter fallback can land closer than an equal-length opposite.
    Mixed,
}

impl FallbackPolicy {
    /// The threshold to apply between a candidate and a stored fingerprint of
    /// the given kinds, or `None` if the pair must not be compared.
    fn threshold_for(
        self,
        candidate: FingerprintKind,
        stored: FingerprintKind,
        threshold: Threshold,
    ) -> Option<u32> {
        use FingerprintKind::{Fallback, Perceptual};

        match (self, candidate, stored) {
            (Self::Mixed, _, _) => Some(threshold.value()),
            (_, Perceptual, Perceptual) => Some(threshold.value()),
            (Self::Segregate, Fallback, Fallback) => Some(0),
            _ => None,
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Segregate => write!(f, "segregate"),
            Self::Exclude => write!(f, "exclude"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "segregate" => Ok(Self::Segregate),
            "exclude" => Ok(Self::Exclude),
            "mixed" => Ok(Self::Mixed),
            other => Err(format!(
                "unknown fallback policy '{other}' (expected segregate, exclude or mixed)"
            )),
        }
    }
}

/// Something that can be checked against: a fingerprint plus the identity
/// reported when it matches.
pub trait Candidate {
    type Id;

    fn fingerprint(&self) -> &Fingerprint;

    fn into_identity(self) -> Self::Id;
}

impl<Id> Candidate for (Fingerprint, Id) {
    type Id = Id;

    fn fingerprint(&self) -> &Fingerprint {
        &self.0
    }

    fn into_identity(self) -> Id {
        self.1
    }
}

impl<'a, Id> Candidate for (&'a Fingerprint, Id) {
    type Id = Id;

    fn fingerprint(&self) -> &Fingerprint {
        self.0
    }

    fn into_identity(self) -> Id {
        self.1
    }
}

impl Candidate for FingerprintRecord {
    type Id = String;

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    fn into_identity(self) -> String {
        self.id
    }
}

impl<'a> Candidate for &'a FingerprintRecord {
    type Id = &'a str;

    fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    fn into_identity(self) -> &'a str {
        &self.id
    }
}

/// A qualifying match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<Id> {
    pub identity: Id,
    pub distance: u32,
}

/// Thresholded near-duplicate detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateDetector {
    threshold: Threshold,
    policy: FallbackPolicy,
}

impl DuplicateDetector {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            policy: FallbackPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Return the first existing entry within the threshold of `candidate`.
    ///
    /// Consumes `existing` lazily and stops at the first match.
    pub fn find_match<I>(
        &self,
        candidate: &Fingerprint,
        existing: I,
    ) -> Option<Match<<I::Item as Candidate>::Id>>
    where
        I: IntoIterator,
        I::Item: Candidate,
    {
        for entry in existing {
            let stored = entry.fingerprint();
            let Some(limit) = self
                .policy
                .threshold_for(candidate.kind(), stored.kind(), self.threshold)
            else {
                continue;
            };

            let distance = candidate.distance(stored);
            if distance <= limit {
                debug!(stored = %stored, distance, limit, "Near-duplicate found");
                return Some(Match {
                    identity: entry.into_identity(),
                    distance,
                });
            }
        }
        None
    }

    pub fn is_duplicate<I>(&self, candidate: &Fingerprint, existing: I) -> bool
    where
        I: IntoIterator,
        I::Item: Candidate,
    {
        self.find_match(candidate, existing).is_some()
    }

    /// Check a candidate against a fresh snapshot of `source`.
    #[instrument(level = "debug", skip_all, fields(candidate = %candidate, threshold = %self.threshold))]
    pub fn check<S>(&self, candidate: &Fingerprint, source: &S) -> Result<Option<Match<String>>>
    where
        S: CandidateSource + ?Sized,
    {
        let snapshot = source.snapshot()?;
        debug!(records = snapshot.len(), "Scanning candidate snapshot");

        let found = self.find_match(candidate, snapshot);
        if let Some(m) = &found {
            info!(identity = %m.identity, distance = m.distance, "Rejected as near-duplicate");
        }
        Ok(found)
    }
}

/// Return the identity of the first existing record within `threshold` of
/// `candidate`, or `None`.
///
/// Pure function of its inputs. Uses [`FallbackPolicy::Segregate`].
pub fn is_near_duplicate<I>(
    candidate: &Fingerprint,
    existing: I,
    threshold: Threshold,
) -> Option<<I::Item as Candidate>::Id>
where
    I: IntoIterator,
    I::Item: Candidate,
{
    DuplicateDetector::new(threshold)
        .find_match(candidate, existing)
        .map(|m| m.identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::MemoryCandidates;

    fn fp(hex: &str) -> Fingerprint {
        Fingerprint::from_hex(hex).unwrap()
    }

    #[test]
    fn test_threshold_bounds() {
        assert_eq!(Threshold::new(0).unwrap(), Threshold::exact());
        assert_eq!(Threshold::new(40).unwrap().value(), 40);
        assert_eq!(Threshold::new(MAX_THRESHOLD).unwrap().value(), 64);
        assert!(matches!(
            Threshold::new(65),
            Err(NeardupError::MisconfiguredThreshold { threshold: 65, max: 64 })
        ));
        assert_eq!(Threshold::default().value(), DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_threshold_deserialize_validates() {
        let ok: Threshold = serde_json::from_str("3").unwrap();
        assert_eq!(ok.value(), 3);
        assert!(serde_json::from_str::<Threshold>("65").is_err());
    }

    #[test]
    fn test_threshold_boundary() {
        let base = fp("0000000000000000");
        let three_bits = fp("0000000000000007");
        let four_bits = fp("000000000000000f");
        let threshold = Threshold::new(3).unwrap();

        assert_eq!(
            is_near_duplicate(&base, vec![(three_bits, "at")], threshold),
            Some("at")
        );
        assert_eq!(
            is_near_duplicate(&base, vec![(four_bits, "over")], threshold),
            None
        );
    }

    #[test]
    fn test_exact_threshold() {
        let base = fp("0123456789abcdef");
        let same = fp("0123456789abcdef");
        let one_off = fp("0123456789abcdee");

        assert!(DuplicateDetector::new(Threshold::exact()).is_duplicate(&base, [(&same, ())]));
        assert!(!DuplicateDetector::new(Threshold::exact()).is_duplicate(&base, [(&one_off, ())]));
    }

    #[test]
    fn test_first_match_wins() {
        let base = fp("0000000000000000");
        let existing = vec![
            (fp("ffffffffffffffff"), "far"),
            (fp("0000000000000003"), "first"),
            (fp("0000000000000000"), "closer"),
        ];
        let found = DuplicateDetector::new(Threshold::new(3).unwrap())
            .find_match(&base, existing)
            .unwrap();
        assert_eq!(found.identity, "first");
        assert_eq!(found.distance, 2);
    }

    #[test]
    fn test_scan_stops_at_first_match() {
        let base = fp("0000000000000000");
        let mut visited = 0;
        let existing = (0..100).map(|i| {
            visited += 1;
            (fp("0000000000000000"), i)
        });

        let found = is_near_duplicate(&base, existing, Threshold::default());
        assert_eq!(found, Some(0));
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_segregate_never_mixes_kinds() {
        let detector = DuplicateDetector::new(Threshold::new(32).unwrap());
        let perceptual = fp("0000000000000000");
        let fallback = fp("000000000000");

        assert!(!detector.is_duplicate(&perceptual, [(&fallback, ())]));
        assert!(!detector.is_duplicate(&fallback, [(&perceptual, ())]));
    }

    #[test]
    fn test_segregate_fallbacks_need_exact_match() {
        let detector = DuplicateDetector::new(Threshold::new(5).unwrap());
        let a = fp("000000000000");
        let a_again = fp("000000000000");
        let near = fp("000000000001");

        assert!(detector.is_duplicate(&a, [(&a_again, ())]));
        assert!(!detector.is_duplicate(&a, [(&near, ())]));
    }

    #[test]
    fn test_exclude_ignores_fallbacks() {
        let detector =
            DuplicateDetector::new(Threshold::new(5).unwrap()).with_policy(FallbackPolicy::Exclude);
        let a = fp("000000000000");
        assert!(!detector.is_duplicate(&a, [(&a, ())]));

        let p = fp("0000000000000000");
        assert!(detector.is_duplicate(&p, [(&p, ())]));
    }

    #[test]
    fn test_mixed_compares_everything() {
        let detector =
            DuplicateDetector::new(Threshold::new(4).unwrap()).with_policy(FallbackPolicy::Mixed);
        let perceptual = fp("0000000000000000");
        let fallback = fp("000000000000");

        // Length penalty of 4 characters.
        let found = detector.find_match(&perceptual, [(&fallback, "legacy")]).unwrap();
        assert_eq!(found.distance, 4);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("segregate".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Segregate));
        assert_eq!(" Mixed ".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Mixed));
        assert_eq!("exclude".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Exclude));
        assert!("sometimes".parse::<FallbackPolicy>().is_err());
    }

    #[test]
    fn test_records_by_reference_and_value() {
        let records: MemoryCandidates = vec![
            FingerprintRecord::new("a", "a.png", fp("ffffffffffffffff")),
            FingerprintRecord::new("b", "b.png", fp("0000000000000001")),
        ]
        .into_iter()
        .collect();

        let candidate = fp("0000000000000000");
        let by_ref: Option<&str> = is_near_duplicate(&candidate, &records, Threshold::default());
        assert_eq!(by_ref, Some("b"));

        let by_value: Option<String> =
            is_near_duplicate(&candidate, records.clone().into_records(), Threshold::default());
        assert_eq!(by_value.as_deref(), Some("b"));
    }

    #[test]
    fn test_check_against_source() {
        let mut records = MemoryCandidates::new();
        records.insert(FingerprintRecord::new("a", "a.png", fp("00000000000000ff")));

        let detector = DuplicateDetector::default();
        assert_eq!(detector.check(&fp("0000000000000000"), &records).unwrap(), None);

        let found = detector.check(&fp("00000000000000fe"), &records).unwrap().unwrap();
        assert_eq!(found.identity, "a");
        assert_eq!(found.distance, 1);
    }
}
