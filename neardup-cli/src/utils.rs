//! Common utility functions shared across CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use neardup_core::{DetectorConfig, FallbackPolicy};
use tracing::debug;

/// Detector overrides shared by `check` and `add`.
#[derive(Args, Debug, Clone, Default)]
pub struct DetectionArgs {
    /// Near-duplicate threshold in bits (overrides NEARDUP_HASH_THRESHOLD)
    #[arg(short, long, value_name = "BITS")]
    pub threshold: Option<u32>,

    /// Fallback fingerprint policy: segregate, exclude or mixed
    #[arg(short, long, value_name = "POLICY")]
    pub policy: Option<FallbackPolicy>,
}

/// Load the detector configuration from the environment, then apply
/// command-line overrides.
pub fn load_config(overrides: &DetectionArgs) -> Result<DetectorConfig> {
    let mut config = DetectorConfig::from_env().context("Invalid configuration")?;

    if let Some(threshold) = overrides.threshold {
        config.threshold = threshold;
    }
    if let Some(policy) = overrides.policy {
        config.fallback_policy = policy;
    }
    config.validate().context("Invalid configuration")?;

    debug!(
        threshold = config.threshold,
        policy = %config.fallback_policy,
        "Loaded configuration"
    );
    Ok(config)
}

/// Read a whole input file.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "Read file");
    Ok(content)
}

/// The final path component, used as the record's filename.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format a record timestamp as a human-readable UTC string.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
