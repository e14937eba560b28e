//! List command implementation.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::store::RecordStore;
use crate::utils::format_timestamp;

/// Execute the list command.
pub async fn execute(store_path: &Path) -> Result<()> {
    let store = RecordStore::load(store_path)?;

    if store.is_empty() {
        println!("No records.");
        return Ok(());
    }

    for record in store.records() {
        println!(
            "{}  {}  {}  {}  {}",
            record.id,
            record.fingerprint.as_str().cyan(),
            record.fingerprint.kind(),
            record.filename,
            format_timestamp(&record.created_at).dimmed()
        );
    }
    Ok(())
}
