//! Candidate sets: the previously accepted fingerprints a new image is
//! checked against.
//!
//! The detector owns no storage. Whoever stores images hands it a snapshot
//! of every known record per evaluation, either directly as an iterator or
//! through a [`CandidateSource`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fingerprint::Fingerprint;

/// A stored image's fingerprint and identity.
///
/// Created once when an upload is accepted; removed when the image is
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    #[serde(rename = "uuid")]
    pub id: String,
    pub filename: String,
    #[serde(flatten)]
    pub fingerprint: Fingerprint,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl FingerprintRecord {
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        fingerprint: Fingerprint,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            fingerprint,
            created_at: Utc::now(),
        }
    }
}

/// Provider of the complete set of existing records.
///
/// Implementations must return a consistent snapshot; the detector never
/// mutates it. Inserting a newly accepted record is the provider's job and
/// happens after the decision.
pub trait CandidateSource {
    fn snapshot(&self) -> Result<Vec<FingerprintRecord>>;
}

/// In-memory candidate set.
#[derive(Debug, Clone, Default)]
pub struct MemoryCandidates {
    records: Vec<FingerprintRecord>,
}

impl MemoryCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: FingerprintRecord) {
        self.records.push(record);
    }

    /// Remove a record by identity, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<FingerprintRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&FingerprintRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn as_slice(&self) -> &[FingerprintRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FingerprintRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<FingerprintRecord> {
        self.records
    }
}

impl CandidateSource for MemoryCandidates {
    fn snapshot(&self) -> Result<Vec<FingerprintRecord>> {
        Ok(self.records.clone())
    }
}

impl FromIterator<FingerprintRecord> for MemoryCandidates {
    fn from_iter<I: IntoIterator<Item = FingerprintRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MemoryCandidates {
    type Item = &'a FingerprintRecord;
    type IntoIter = std::slice::Iter<'a, FingerprintRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
