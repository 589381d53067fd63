//! Error types for the document-to-chunks pipeline.
//!
//! [`FileFluxError`] is the crate's single error type. Each variant maps to
//! one entry of the error taxonomy in spec §7, and [`FileFluxError::kind`]
//! maps that onto the exit-code intent a CLI wrapper would use (spec §6) —
//! this crate does not define a CLI itself, only the mapping.

use thiserror::Error;

/// Errors that can occur at any stage of reading, parsing, chunking, or
/// serializing a document.
#[derive(Error, Debug)]
pub enum FileFluxError {
    /// The requested input file does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// No registered reader or parser recognizes the file's extension.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O failure reading input or writing output.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// A reader could not decode its input into valid text.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// An optional LLM or embedding provider call failed or timed out.
    ///
    /// Per spec §7 this is never fatal: callers that see this degrade to the
    /// heuristic path and continue; it is surfaced here only so the decision
    /// to degrade can be logged with a reason.
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Caller-supplied options were invalid (e.g. an unknown strategy name).
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// Cooperative cancellation was observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// A strategy produced zero chunks for non-empty input, or another
    /// internal invariant was violated.
    #[error("internal error: {0}")]
    InternalError(String),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error("yaml error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Opaque backend failure with no dedicated taxonomy entry — the
    /// catch-all a `Reader`/`Parser`/`EmbeddingProvider`/
    /// `TextCompletionProvider` implementation (out of this crate's scope,
    /// per spec §1) can propagate via `?` without defining its own error
    /// type, mirroring `DoclingError::ParserError(#[from] anyhow::Error)`.
    #[error("backend error: {0}")]
    BackendError(#[from] anyhow::Error),
}

/// Convenience alias for `Result<T, FileFluxError>`.
pub type Result<T> = std::result::Result<T, FileFluxError>;

/// Exit-code intent for a CLI wrapper around this crate (spec §6).
///
/// This crate has no CLI of its own; the mapping is exposed so one can be
/// built without re-deriving the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Success (no error occurred).
    Ok = 0,
    /// Internal error not otherwise classified.
    InternalError = 1,
    /// Requested format has no registered reader/parser.
    UnsupportedFormat = 2,
    /// Input path does not exist.
    NotFound = 3,
    /// I/O failure.
    IoError = 4,
    /// Reader could not decode input.
    DecodeError = 5,
    /// Optional-provider call failed, including an opaque backend failure.
    ProviderError = 6,
    /// Caller-supplied options were invalid.
    InvalidOptions = 7,
    /// Cooperative cancellation (conventionally SIGINT's 128+2).
    Cancelled = 130,
}

impl FileFluxError {
    /// Classifies this error for exit-code purposes.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::IoError(_) => ErrorKind::IoError,
            Self::DecodeError(_) => ErrorKind::DecodeError,
            Self::ProviderError(_) | Self::BackendError(_) => ErrorKind::ProviderError,
            Self::InvalidOptions(_) => ErrorKind::InvalidOptions,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InternalError(_) | Self::JsonError(_) | Self::YamlError(_) => {
                ErrorKind::InternalError
            }
        }
    }

    /// True if this error kind is permitted to retry under the recovery
    /// discipline in spec §7 (idempotent optional-provider calls only).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderError(_) | Self::BackendError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping_matches_spec_exit_codes() {
        assert_eq!(FileFluxError::NotFound("x".into()).kind() as u8, 3);
        assert_eq!(
            FileFluxError::UnsupportedFormat("x".into()).kind() as u8,
            2
        );
        assert_eq!(FileFluxError::Cancelled.kind() as u8, 130);
        assert_eq!(FileFluxError::InvalidOptions("x".into()).kind() as u8, 7);
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FileFluxError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::IoError);
    }

    #[test]
    fn only_provider_errors_are_retryable() {
        assert!(FileFluxError::ProviderError("timeout".into()).is_retryable());
        assert!(!FileFluxError::InternalError("bug".into()).is_retryable());
        assert!(!FileFluxError::Cancelled.is_retryable());
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = FileFluxError::DecodeError("bad utf-8".into());
        assert_eq!(err.to_string(), "decode error: bad utf-8");
    }

    #[test]
    fn backend_error_converts_from_anyhow_and_is_retryable_provider_kind() {
        let anyhow_err = anyhow::anyhow!("custom backend failure");
        let err: FileFluxError = anyhow_err.into();

        assert!(matches!(err, FileFluxError::BackendError(_)));
        assert_eq!(err.kind(), ErrorKind::ProviderError);
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "backend error: custom backend failure");
    }
}
