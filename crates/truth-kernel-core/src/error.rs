//! Error types for the Truth Kernel Core.

use thiserror::Error;

/// Errors produced while turning JSON text into a [`Record`](crate::Record).
///
/// All of these are recoverable: the caller gets the error back and no
/// engine state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("unexpected field: {0}")]
    UnexpectedField(String),

    #[error("invalid timestamp")]
    InvalidTimestamp,
}

impl ParseError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Malformed(_) => "malformed",
            ParseError::MissingField(_) => "missing_field",
            ParseError::UnexpectedField(_) => "unexpected_field",
            ParseError::InvalidTimestamp => "invalid_timestamp",
        }
    }

    /// The detail carried by the error, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ParseError::Malformed(detail)
            | ParseError::MissingField(detail)
            | ParseError::UnexpectedField(detail) => Some(detail),
            ParseError::InvalidTimestamp => None,
        }
    }
}

/// Core errors that can occur while handling key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("key material is neither hex nor base64")]
    UndecodableKeyMaterial,
}
