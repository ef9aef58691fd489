//! Error types for the quire PDF parsing library.

use crate::model::objects::Ref;
use thiserror::Error;

/// Why a password was rejected.
///
/// Callers are expected to re-prompt on either value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordResponse {
    /// The document is encrypted and no password was supplied.
    NeedPassword,
    /// A password was supplied but matched neither the owner nor the user entry.
    IncorrectPassword,
}

impl std::fmt::Display for PasswordResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NeedPassword => f.write_str("no password given"),
            Self::IncorrectPassword => f.write_str("incorrect password"),
        }
    }
}

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(Ref),

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("password error: {0}")]
    Password(PasswordResponse),

    /// Bytes `begin..end` of a range-backed source have not been loaded yet.
    #[error("missing data for range {begin}..{end}")]
    MissingData { begin: usize, end: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PdfError {
    /// True for the one error that means "fetch more bytes and retry".
    pub const fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData { .. })
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
