//! Add command implementation.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use neardup_core::{FingerprintRecord, Upload, UploadGate, Verdict};
use tracing::info;
use uuid::Uuid;

use crate::store::RecordStore;
use crate::utils::{display_name, load_config, read_file, DetectionArgs};

/// Execute the add command.
pub async fn execute(
    files: Vec<PathBuf>,
    detection: DetectionArgs,
    dry_run: bool,
    store_path: &Path,
    quiet: bool,
) -> Result<()> {
    let config = load_config(&detection)?;
    let gate = UploadGate::new(config.hasher(), config.detector()?);
    let mut store = RecordStore::load(store_path)?;

    let uploads = files
        .iter()
        .map(|file| -> Result<Upload> { Ok(Upload::new(display_name(file), read_file(file)?)) })
        .collect::<Result<Vec<_>>>()?;

    let report = gate.evaluate_with_timeout(uploads, store.records()).await;

    for (name, verdict) in &report.outcomes {
        match verdict {
            Verdict::Accepted(fp) => {
                let id = Uuid::new_v4().to_string();
                if !quiet {
                    println!("{} {} {}", "added".green().bold(), name, id.dimmed());
                }
                store.insert(FingerprintRecord::new(id, name.clone(), fp.clone()));
            }
            Verdict::Duplicate { of, distance } => {
                if !quiet {
                    println!(
                        "{} {} duplicates {} (distance {})",
                        "skipped".yellow().bold(),
                        name,
                        of,
                        distance
                    );
                }
            }
            Verdict::Rejected(reason) => {
                if !quiet {
                    println!("{} {} ({})", "rejected".red().bold(), name, reason);
                }
            }
        }
    }

    if dry_run {
        info!("Dry run, store left unchanged");
    } else if report.accepted().next().is_some() {
        store.save()?;
    }

    if !quiet {
        println!("{}", report.summary());
    }
    Ok(())
}
