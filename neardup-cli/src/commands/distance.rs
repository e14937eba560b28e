//! Distance command implementation.

use anyhow::Result;
use neardup_core::Fingerprint;

/// Execute the distance command.
pub async fn execute(a: String, b: String) -> Result<()> {
    let a = Fingerprint::from_hex(&a)?;
    let b = Fingerprint::from_hex(&b)?;
    println!("{}", a.distance(&b));
    Ok(())
}
