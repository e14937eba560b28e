//! Detector configuration.
//!
//! Handles loading configuration from environment variables with sensible
//! defaults. The threshold is validated at load time so a misconfiguration
//! fails fast instead of on the first upload.

use std::time::Duration;

use tracing::warn;

use crate::detector::{DuplicateDetector, FallbackPolicy, Threshold, DEFAULT_THRESHOLD};
use crate::error::{NeardupError, Result};
use crate::fingerprint::{FingerprintHasher, HasherLimits};

const MIB: u64 = 1024 * 1024;

/// Detector configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Near-duplicate threshold in bits (default: 5)
    pub threshold: u32,
    /// Fallback fingerprint handling (default: segregate)
    pub fallback_policy: FallbackPolicy,
    /// Inputs above this many bytes are not decoded (default: 25 MiB)
    pub max_input_bytes: usize,
    /// Maximum image width/height in pixels (default: 8192)
    pub max_dimension: u32,
    /// Maximum decoder allocation in bytes (default: 256 MiB)
    pub max_alloc_bytes: u64,
    /// Decode timeout for the async path (default: 10s)
    pub decode_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let limits = HasherLimits::default();
        Self {
            threshold: DEFAULT_THRESHOLD,
            fallback_policy: FallbackPolicy::default(),
            max_input_bytes: limits.max_input_bytes,
            max_dimension: limits.max_dimension,
            max_alloc_bytes: limits.max_alloc_bytes,
            decode_timeout: limits.decode_timeout,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables.
    ///
    /// - `NEARDUP_HASH_THRESHOLD` (or legacy `HASH_THRESHOLD`)
    /// - `NEARDUP_FALLBACK_POLICY` (`segregate`, `exclude`, `mixed`)
    /// - `NEARDUP_MAX_INPUT_MB`
    /// - `NEARDUP_MAX_DIMENSION`
    /// - `NEARDUP_MAX_ALLOC_MB`
    /// - `NEARDUP_DECODE_TIMEOUT_SECS`
    ///
    /// Unparseable values fall back to defaults. An out-of-range threshold or
    /// a megabyte count that overflows a byte count is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let threshold = lookup("NEARDUP_HASH_THRESHOLD")
            .or_else(|| lookup("HASH_THRESHOLD"))
            .and_then(|v| parse_or_warn("NEARDUP_HASH_THRESHOLD", &v))
            .unwrap_or(defaults.threshold);

        let fallback_policy = lookup("NEARDUP_FALLBACK_POLICY")
            .and_then(|v| parse_or_warn("NEARDUP_FALLBACK_POLICY", &v))
            .unwrap_or(defaults.fallback_policy);

        let max_input_bytes = lookup("NEARDUP_MAX_INPUT_MB")
            .and_then(|v| parse_or_warn::<usize>("NEARDUP_MAX_INPUT_MB", &v))
            .map(|mb| {
                mb.checked_mul(MIB as usize)
                    .ok_or_else(|| too_large("NEARDUP_MAX_INPUT_MB", mb))
            })
            .transpose()?
            .unwrap_or(defaults.max_input_bytes);

        let max_dimension = lookup("NEARDUP_MAX_DIMENSION")
            .and_then(|v| parse_or_warn("NEARDUP_MAX_DIMENSION", &v))
            .unwrap_or(defaults.max_dimension);

        let max_alloc_bytes = lookup("NEARDUP_MAX_ALLOC_MB")
            .and_then(|v| parse_or_warn::<u64>("NEARDUP_MAX_ALLOC_MB", &v))
            .map(|mb| {
                mb.checked_mul(MIB)
                    .ok_or_else(|| too_large("NEARDUP_MAX_ALLOC_MB", mb))
            })
            .transpose()?
            .unwrap_or(defaults.max_alloc_bytes);

        let decode_timeout = lookup("NEARDUP_DECODE_TIMEOUT_SECS")
            .and_then(|v| parse_or_warn("NEARDUP_DECODE_TIMEOUT_SECS", &v))
            .map(Duration::from_secs)
            .unwrap_or(defaults.decode_timeout);

        let config = Self {
            threshold,
            fallback_policy,
            max_input_bytes,
            max_dimension,
            max_alloc_bytes,
            decode_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the threshold range.
    pub fn validate(&self) -> Result<()> {
        Threshold::new(self.threshold).map(|_| ())
    }

    pub fn limits(&self) -> HasherLimits {
        HasherLimits {
            max_input_bytes: self.max_input_bytes,
            max_dimension: self.max_dimension,
            max_alloc_bytes: self.max_alloc_bytes,
            decode_timeout: self.decode_timeout,
        }
    }

    pub fn hasher(&self) -> FingerprintHasher {
        FingerprintHasher::new(self.limits())
    }

    pub fn detector(&self) -> Result<DuplicateDetector> {
        Ok(DuplicateDetector::new(Threshold::new(self.threshold)?).with_policy(self.fallback_policy))
    }
}

fn too_large(key: &str, megabytes: impl std::fmt::Display) -> NeardupError {
    NeardupError::ConfigError(format!("{key}={megabytes} overflows a byte count"))
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value, "Ignoring unparseable configuration value");
            None
        }
    }
}
