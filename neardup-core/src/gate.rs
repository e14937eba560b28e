//! Batch upload gating.
//!
//! Decides accept-or-reject for a batch of uploads (e.g. all attachments of
//! one chat message) against the stored records and against the uploads
//! accepted earlier in the same batch.

use std::fmt;

use tracing::{debug, info, instrument};

use crate::candidates::FingerprintRecord;
use crate::detector::DuplicateDetector;
use crate::error::NeardupError;
use crate::fingerprint::{Fingerprint, FingerprintHasher};

/// File extensions accepted as images.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Case-insensitive check of a file name against the accepted image
/// extensions.
pub fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

/// A single upload in a batch.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Why an upload was turned away before any duplicate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotAnImage,
    Empty,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnImage => write!(f, "not an image file"),
            Self::Empty => write!(f, "empty file"),
        }
    }
}

/// Where a duplicate was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateOf {
    /// A stored record, by identity.
    Stored(String),
    /// An earlier upload in the same batch, by name.
    Batch(String),
}

impl fmt::Display for DuplicateOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored(id) => write!(f, "{id}"),
            Self::Batch(name) => write!(f, "{name} (same batch)"),
        }
    }
}

/// Outcome for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(Fingerprint),
    Duplicate { of: DuplicateOf, distance: u32 },
    Rejected(RejectReason),
}

/// Outcomes for a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<(String, Verdict)>,
}

impl BatchReport {
    pub fn accepted(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.outcomes.iter().filter_map(|(name, verdict)| match verdict {
            Verdict::Accepted(fp) => Some((name.as_str(), fp)),
            _ => None,
        })
    }

    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &DuplicateOf, u32)> {
        self.outcomes.iter().filter_map(|(name, verdict)| match verdict {
            Verdict::Duplicate { of, distance } => Some((name.as_str(), of, *distance)),
            _ => None,
        })
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&str, RejectReason)> {
        self.outcomes.iter().filter_map(|(name, verdict)| match verdict {
            Verdict::Rejected(reason) => Some((name.as_str(), *reason)),
            _ => None,
        })
    }

    /// One-line summary, e.g. `Uploaded 2 new image(s). Skipped 1 duplicate(s).`
    pub fn summary(&self) -> String {
        let accepted = self.accepted().count();
        let duplicates = self.duplicates().count();

        let mut parts = Vec::new();
        if accepted > 0 {
            parts.push(format!("Uploaded {accepted} new image(s)."));
        }
        if duplicates > 0 {
            parts.push(format!("Skipped {duplicates} duplicate(s)."));
        }
        if parts.is_empty() {
            "No images to upload.".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// Accept-or-reject decisions for batches of uploads.
#[derive(Debug, Clone, Default)]
pub struct UploadGate {
    hasher: FingerprintHasher,
    detector: DuplicateDetector,
}

impl UploadGate {
    pub fn new(hasher: FingerprintHasher, detector: DuplicateDetector) -> Self {
        Self { hasher, detector }
    }

    pub fn hasher(&self) -> &FingerprintHasher {
        &self.hasher
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    /// Evaluate a batch against `existing`.
    ///
    /// Each upload is compared with the stored records first, then with the
    /// uploads already accepted in this batch, so a batch never accepts two
    /// near-identical images.
    #[instrument(level = "debug", skip_all, fields(existing = existing.len()))]
    pub fn evaluate<I>(&self, uploads: I, existing: &[FingerprintRecord]) -> BatchReport
    where
        I: IntoIterator<Item = Upload>,
    {
        let mut batch = BatchState::default();

        for upload in uploads {
            let verdict = match screen(&upload) {
                Some(rejected) => rejected,
                None => match self.hasher.fingerprint(&upload.bytes) {
                    Ok(fingerprint) => self.decide(fingerprint, existing, &batch.accepted),
                    Err(err) => rejection_for(&err),
                },
            };
            batch.push(upload.name, verdict);
        }

        batch.finish()
    }

    /// Like [`evaluate`](Self::evaluate), but every decode runs under the
    /// hasher's `decode_timeout`. A decode that overruns is accepted or
    /// rejected on its fallback fingerprint; the batch always completes.
    #[cfg(feature = "async")]
    #[instrument(level = "debug", skip_all, fields(existing = existing.len()))]
    pub async fn evaluate_with_timeout<I>(
        &self,
        uploads: I,
        existing: &[FingerprintRecord],
    ) -> BatchReport
    where
        I: IntoIterator<Item = Upload>,
    {
        let mut batch = BatchState::default();

        for upload in uploads {
            let verdict = match screen(&upload) {
                Some(rejected) => rejected,
                None => match self.hasher.fingerprint_with_timeout(upload.bytes).await {
                    Ok(result) => self.decide(result.fingerprint, existing, &batch.accepted),
                    Err(err) => rejection_for(&err),
                },
            };
            batch.push(upload.name, verdict);
        }

        batch.finish()
    }

    fn decide(
        &self,
        fingerprint: Fingerprint,
        existing: &[FingerprintRecord],
        accepted_in_batch: &[(Fingerprint, String)],
    ) -> Verdict {
        if let Some(m) = self.detector.find_match(&fingerprint, existing) {
            return Verdict::Duplicate {
                of: DuplicateOf::Stored(m.identity.to_string()),
                distance: m.distance,
            };
        }

        let in_batch = accepted_in_batch
            .iter()
            .map(|(fp, name)| (fp, name.as_str()));
        if let Some(m) = self.detector.find_match(&fingerprint, in_batch) {
            return Verdict::Duplicate {
                of: DuplicateOf::Batch(m.identity.to_string()),
                distance: m.distance,
            };
        }

        Verdict::Accepted(fingerprint)
    }
}

/// Verdicts so far plus the fingerprints accepted in this batch.
#[derive(Default)]
struct BatchState {
    accepted: Vec<(Fingerprint, String)>,
    report: BatchReport,
}

impl BatchState {
    fn push(&mut self, name: String, verdict: Verdict) {
        debug!(name = %name, verdict = ?verdict, "Judged upload");
        if let Verdict::Accepted(fp) = &verdict {
            self.accepted.push((fp.clone(), name.clone()));
        }
        self.report.outcomes.push((name, verdict));
    }

    fn finish(self) -> BatchReport {
        info!(summary = %self.report.summary(), "Batch evaluated");
        self.report
    }
}

/// Rejections decided before any hashing.
fn screen(upload: &Upload) -> Option<Verdict> {
    if !has_image_extension(&upload.name) {
        return Some(Verdict::Rejected(RejectReason::NotAnImage));
    }
    if upload.bytes.is_empty() {
        return Some(Verdict::Rejected(RejectReason::Empty));
    }
    None
}

fn rejection_for(err: &NeardupError) -> Verdict {
    match err {
        NeardupError::InvalidInput(_) => Verdict::Rejected(RejectReason::Empty),
        _ => Verdict::Rejected(RejectReason::NotAnImage),
    }
}
