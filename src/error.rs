//! All error types for the l10nmerge crate.
//!
//! Malformed regions inside a document are never errors: parsers turn them
//! into [`crate::types::Junk`] entries. Only the failures below leave the
//! crate through a `Result`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid resource: {0}")]
    InvalidResource(String),
}

impl Error {
    /// Creates a new encoding error
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Error::Encoding(message.into())
    }

    /// Returns `true` for the errors a caller can hit with well-formed bytes
    /// in an unsupported shape (unknown dialect or undecodable content).
    pub fn is_input_error(&self) -> bool {
        matches!(self, Error::UnknownDialect(_) | Error::Encoding(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_dialect_error() {
        let error = Error::UnknownDialect("foo.txt".to_string());
        assert_eq!(error.to_string(), "unknown dialect `foo.txt`");
        assert!(error.is_input_error());
    }

    #[test]
    fn test_encoding_error() {
        let error = Error::encoding_error("invalid UTF-8 at byte 3");
        assert_eq!(error.to_string(), "encoding error: invalid UTF-8 at byte 3");
        assert!(error.is_input_error());
    }

    #[test]
    fn test_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = Error::from(io_error);
        assert!(error.to_string().contains("I/O error"));
        assert!(!error.is_input_error());
    }

    #[test]
    fn test_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let error = Error::Json(json_error);
        assert!(error.to_string().contains("JSON error"));
    }

    #[test]
    fn test_invalid_resource_error() {
        let error = Error::InvalidResource("no channels to merge".to_string());
        assert_eq!(error.to_string(), "invalid resource: no channels to merge");
    }

    #[test]
    fn test_error_debug() {
        let error = Error::UnknownDialect("test".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("UnknownDialect"));
        assert!(debug.contains("test"));
    }
}
