//! Error types for token operations

use thiserror::Error;

/// Verification failures for compact bearer tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Failures talking to the key-value backend
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("key-value backend unavailable: {0}")]
    Unavailable(String),
}
