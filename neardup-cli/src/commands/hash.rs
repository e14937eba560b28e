//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use neardup_core::{DetectorConfig, FallbackReason, FingerprintKind};
use tracing::info;

use crate::utils::{display_name, read_file};

/// Output format for fingerprints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct HashOutput {
    file: String,
    hash: String,
    kind: FingerprintKind,
    fallback_reason: Option<FallbackReason>,
}

/// Execute the hash command.
pub async fn execute(files: Vec<PathBuf>, format: OutputFormat) -> Result<()> {
    if files.is_empty() {
        bail!("No files given");
    }

    let hasher = DetectorConfig::from_env()?.hasher();
    let mut outputs = Vec::with_capacity(files.len());

    for file in &files {
        let content = read_file(file)?;
        let result = hasher.fingerprint_with_timeout(content).await?;

        info!(
            path = %file.display(),
            hash = %result.fingerprint,
            kind = %result.fingerprint.kind(),
            "Fingerprinted file"
        );

        outputs.push(HashOutput {
            file: display_name(file),
            hash: result.fingerprint.as_str().to_string(),
            kind: result.fingerprint.kind(),
            fallback_reason: result.fallback_reason,
        });
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outputs)?),
        OutputFormat::Text => {
            for out in &outputs {
                match out.fallback_reason {
                    Some(reason) => println!(
                        "{}  {}  {} {}",
                        out.hash.yellow(),
                        out.kind,
                        out.file,
                        format!("({reason})").dimmed()
                    ),
                    None => println!("{}  {}  {}", out.hash.green(), out.kind, out.file),
                }
            }
        }
    }

    Ok(())
}
