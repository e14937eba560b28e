//! Check command implementation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::{debug, info};

use crate::store::RecordStore;
use crate::utils::{load_config, read_file, DetectionArgs};

/// Execute the check command.
///
/// Exits through a "Duplicate found" error when the file matches a stored
/// record, so the caller maps it to the duplicate exit code.
pub async fn execute(
    file: PathBuf,
    detection: DetectionArgs,
    store_path: &Path,
    quiet: bool,
) -> Result<()> {
    let config = load_config(&detection)?;
    let detector = config.detector()?;
    let store = RecordStore::load(store_path)?;

    let content = read_file(&file)?;
    let result = config.hasher().fingerprint_with_timeout(content).await?;
    debug!(hash = %result.fingerprint, reason = ?result.fallback_reason, "Computed fingerprint");

    match detector.check(&result.fingerprint, &store)? {
        Some(found) => {
            let filename = store
                .get(&found.identity)
                .map(|r| r.filename.as_str())
                .unwrap_or("unknown");

            if !quiet {
                println!(
                    "{}",
                    format!(
                        "DUPLICATE of {} ({}), distance {}",
                        found.identity, filename, found.distance
                    )
                    .red()
                    .bold()
                );
            }
            bail!(
                "Duplicate found: {} matches {} at distance {}",
                file.display(),
                found.identity,
                found.distance
            )
        }
        None => {
            info!(path = %file.display(), threshold = %detector.threshold(), "No near-duplicate");
            if !quiet {
                println!("{}", "UNIQUE".green().bold());
            }
            Ok(())
        }
    }
}
