use thiserror::Error;

/// Errors surfaced to the UI boundary
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any transport call (empty admin password, ...)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Malformed backup file or device payload
    #[error("parse error: {0}")]
    Parse(String),

    /// Backup file without the `configfile` discriminator
    #[error("not a configuration backup: missing configfile command")]
    SchemaMismatch,

    /// Network or device failure, never retried
    #[error("transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("no configuration loaded yet")]
    NotLoaded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
