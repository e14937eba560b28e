use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeardupError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Misconfigured threshold: {threshold} exceeds maximum of {max}")]
    MisconfiguredThreshold { threshold: u32, max: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Candidate source error: {0}")]
    CandidateSource(String),
}

pub type Result<T> = std::result::Result<T, NeardupError>;
