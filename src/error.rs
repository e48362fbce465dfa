//! Centralized error types for mtomxop.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mtomxop library.
#[derive(Error, Debug)]
pub enum MtomError {
    /// The attachment source cannot be turned into an attachment
    /// (e.g. an in-memory buffer without a filename).
    #[error("Invalid attachment input: {0}")]
    InvalidInput(String),

    /// An operation was attempted on an attachment whose state does not allow it.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Something other than an attachment was handed to the registration API.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The SOAP envelope could not be parsed or serialized.
    #[error("XML error: {0}")]
    Xml(String),

    /// The HTTP collaborator failed to deliver the package.
    #[error("HTTP error: {0}")]
    Http(String),
}

/// Convenience alias for `Result<T, MtomError>`.
pub type Result<T> = std::result::Result<T, MtomError>;

impl MtomError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `MtomError::io`).
impl From<std::io::Error> for MtomError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
