//! Remove command implementation.

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::info;

use crate::store::RecordStore;

/// Execute the remove command.
pub async fn execute(id: String, store_path: &Path, quiet: bool) -> Result<()> {
    let mut store = RecordStore::load(store_path)?;

    let Some(record) = store.remove(&id) else {
        bail!("No record with id {id}");
    };
    store.save()?;

    info!(id = %record.id, filename = %record.filename, "Removed record");
    if !quiet {
        println!("{} {} ({})", "removed".green().bold(), record.id, record.filename);
    }
    Ok(())
}
