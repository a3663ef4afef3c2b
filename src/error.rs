//! Centralized error types for mimebox.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mimebox library.
#[derive(Error, Debug)]
pub enum MimeboxError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// A structural header (`Content-Type`, or its `boundary` parameter) is
    /// missing or cannot be parsed.
    #[error("Malformed {header} header: {reason}")]
    MalformedHeader { header: String, reason: String },

    /// The payload of a leaf part could not be transfer-decoded.
    #[error("Failed to decode {encoding} payload: {reason}")]
    DecodeFailure { encoding: String, reason: String },

    /// The child parts of a multipart container could not be read.
    #[error("Multipart read error: {0}")]
    MultipartRead(String),

    /// Containers are nested deeper than the configured limit.
    #[error("Multipart nesting exceeds maximum depth of {depth}")]
    NestingTooDeep { depth: usize },

    /// An export operation failed.
    #[error("Export error: {0}")]
    ExportError(String),
}

/// Convenience alias for `Result<T, MimeboxError>`.
pub type Result<T> = std::result::Result<T, MimeboxError>;

impl MimeboxError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `MalformedHeader` variant.
    pub fn malformed(header: &str, reason: impl Into<String>) -> Self {
        Self::MalformedHeader {
            header: header.to_string(),
            reason: reason.into(),
        }
    }

    /// `true` for errors caused by the message structure rather than its payload.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MalformedHeader { .. } | Self::MultipartRead(_) | Self::NestingTooDeep { .. }
        )
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (e.g. reading an in-memory part body).
impl From<std::io::Error> for MimeboxError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<stream>"),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_classification() {
        assert!(MimeboxError::malformed("Content-Type", "missing").is_structural());
        assert!(MimeboxError::MultipartRead("eof".into()).is_structural());
        assert!(!MimeboxError::DecodeFailure {
            encoding: "base64".into(),
            reason: "bad".into(),
        }
        .is_structural());
    }

    #[test]
    fn test_display_messages() {
        let err = MimeboxError::malformed("Content-Type", "no media type");
        assert_eq!(
            err.to_string(),
            "Malformed Content-Type header: no media type"
        );
    }
}
