//! JSON record store.
//!
//! The store is a single JSON array of [`FingerprintRecord`]s, the same shape
//! the image service exposes as its hash listing. A missing file is an empty
//! store.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use neardup_core::{CandidateSource, FingerprintRecord, MemoryCandidates};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct RecordStore {
    path: PathBuf,
    records: MemoryCandidates,
}

impl RecordStore {
    /// Load the store at `path`, or start empty if it does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Store not found, starting empty");
            return Ok(Self {
                path: path.to_path_buf(),
                records: MemoryCandidates::new(),
            });
        }

        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read store: {}", path.display()))?;
        let records: Vec<FingerprintRecord> = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse store: {}", path.display()))?;

        debug!(path = %path.display(), records = records.len(), "Loaded store");
        Ok(Self {
            path: path.to_path_buf(),
            records: records.into_iter().collect(),
        })
    }

    /// Write the store atomically: a sibling temp file is renamed over it,
    /// so readers see either the old or the new array.
    pub fn save(&self) -> Result<()> {
        let records: Vec<&FingerprintRecord> = self.records.iter().collect();
        let json = serde_json::to_vec_pretty(&records).context("Failed to serialize store")?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let write_err = || format!("Failed to write store: {}", self.path.display());

        let mut tmp = NamedTempFile::new_in(dir).with_context(write_err)?;
        tmp.write_all(&json).with_context(write_err)?;
        tmp.as_file().sync_all().with_context(write_err)?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(write_err)?;

        debug!(path = %self.path.display(), records = records.len(), "Saved store");
        Ok(())
    }

    pub fn insert(&mut self, record: FingerprintRecord) {
        self.records.insert(record);
    }

    pub fn remove(&mut self, id: &str) -> Option<FingerprintRecord> {
        self.records.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&FingerprintRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> &[FingerprintRecord] {
        self.records.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CandidateSource for RecordStore {
    fn snapshot(&self) -> neardup_core::Result<Vec<FingerprintRecord>> {
        self.records.snapshot()
    }
}
