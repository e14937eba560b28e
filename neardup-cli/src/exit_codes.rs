//! Exit codes following sysexits.h conventions.
//!
//! Scripts can tell "duplicate found" apart from genuine failures without
//! parsing output.

/// Successful execution (image is unique, command completed).
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error or misconfigured detector.
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// The checked image is a near-duplicate of a stored record.
/// Maps to EX_DATAERR from sysexits.h.
pub const DUPLICATE_FOUND: i32 = 65;

/// Cannot open input file or record store.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// I/O error (cannot write the record store).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
#[derive(Debug)]
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Classify error by inspecting the chain
        let code = if message.contains("Duplicate found") {
            DUPLICATE_FOUND
        } else if message.contains("Failed to read file")
            || message.contains("Failed to read store")
            || message.contains("Failed to parse store")
        {
            INPUT_ERROR
        } else if message.contains("Misconfigured threshold")
            || message.contains("Invalid configuration")
            || message.contains("Configuration error")
            || message.contains("Invalid fingerprint")
        {
            USAGE_ERROR
        } else if message.contains("Failed to write store") || message.contains("serialize") {
            IO_ERROR
        } else {
            GENERAL_ERROR
        };

        Self {
            code,
            message: Some(message),
        }
    }
}
