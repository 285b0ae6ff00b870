//! Error types for authentication operations

use thiserror::Error;
use token_core::{StoreError, TokenError};

use crate::directory::DirectoryError;

/// Transport-level grouping for [`AuthError`]
///
/// The HTTP boundary (outside this crate) maps kinds to status codes. The
/// request gate never surfaces these: it degrades to anonymous instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Conflict,
    Unauthorized,
    /// Reserved for the profile layer; nothing in this core produces it.
    Forbidden,
    ServiceUnavailable,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an email address or phone number is required")]
    MissingIdentifier,

    #[error("invalid {field}")]
    InvalidIdentifierFormat { field: &'static str },

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("{field} already in use")]
    DuplicateIdentifier { field: &'static str },

    #[error("invalid account or password")]
    InvalidCredentials,

    #[error("account has been disabled")]
    AccountDisabled,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("token is not a {expected} token")]
    WrongTokenType { expected: &'static str },

    #[error("refresh token has been revoked")]
    TokenRevoked,

    #[error("invalid user id")]
    InvalidSubject,

    #[error("user not found")]
    UserNotFound,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("identity provider exchange failed: {0}")]
    ProviderExchange(String),

    #[error("identity provider did not supply an email")]
    MissingProviderEmail,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("user directory unavailable: {0}")]
    Directory(String),

    #[error("token store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingIdentifier
            | AuthError::InvalidIdentifierFormat { .. }
            | AuthError::WeakPassword(_)
            | AuthError::UnknownProvider(_) => ErrorKind::BadRequest,

            AuthError::DuplicateIdentifier { .. } => ErrorKind::Conflict,

            AuthError::InvalidCredentials
            | AuthError::AccountDisabled
            | AuthError::InvalidToken(_)
            | AuthError::WrongTokenType { .. }
            | AuthError::TokenRevoked
            | AuthError::InvalidSubject
            | AuthError::UserNotFound
            | AuthError::ProviderExchange(_)
            | AuthError::MissingProviderEmail => ErrorKind::Unauthorized,

            AuthError::Hashing(_)
            | AuthError::Directory(_)
            | AuthError::Store(_)
            | AuthError::Config(_) => ErrorKind::ServiceUnavailable,
        }
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            // A duplicate surfacing here means a unique constraint fired
            // under a concurrent write; to the caller it is a plain conflict.
            DirectoryError::Duplicate { field } => AuthError::DuplicateIdentifier { field },
            DirectoryError::Unavailable(message) => AuthError::Directory(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
