//! # Auth-Core
//!
//! Authentication and token lifecycle for Authgate.
//!
//! This crate provides:
//! - Password registration and login with Argon2 hashing
//! - Access/refresh token pairs with single-use refresh rotation
//! - Logout via token blacklist and refresh-session revocation
//! - Federated login (Google, Facebook) with find-or-create by email
//! - A per-request bearer gate yielding an explicit [`AuthContext`]
//!
//! ## Architecture
//!
//! Token signing and TTL storage live in `token-core`; this crate layers the
//! account flows on top and reaches persistent user storage only through the
//! [`UserDirectory`] seam. The request gate fails open to anonymous while
//! the service operations fail closed with typed errors — endpoint-level
//! authorization is the embedding application's responsibility.

pub mod api;
pub mod authn;
pub mod config;
pub mod directory;
pub mod error;
pub mod oauth;
pub mod password;
pub mod service;
pub mod types;
pub mod validation;

pub use authn::{AuthContext, AuthenticatedUser, RequestAuthenticator};
pub use config::{AdminBootstrap, AuthConfig};
pub use directory::{DirectoryError, MemoryUserDirectory, UserDirectory};
pub use error::{AuthError, ErrorKind, Result};
pub use oauth::{FederatedIdentityResolver, FederatedProfile, ProviderConfig, ProviderKind};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use service::AuthenticationService;
pub use token_core::{Role, TokenClaims, TokenCodec, TokenStore};
pub use types::{AuthResponse, Principal, RegisterRequest, UserProfile, UserSummary};

use std::sync::Arc;
use std::time::Duration;

/// Wired service stack
pub struct AuthStack {
    pub auth: Arc<AuthenticationService>,
    pub resolver: Arc<FederatedIdentityResolver>,
    pub authenticator: Arc<RequestAuthenticator>,
}

/// Initialize the auth stack against the given directory, with an in-memory
/// token store.
pub async fn init(config: AuthConfig, directory: Arc<dyn UserDirectory>) -> Result<AuthStack> {
    let store = TokenStore::new(Arc::new(token_core::MemoryStore::new()));
    init_with_store(config, directory, store).await
}

/// Initialize the auth stack against the given directory and token store.
pub async fn init_with_store(
    config: AuthConfig,
    directory: Arc<dyn UserDirectory>,
    store: TokenStore,
) -> Result<AuthStack> {
    let codec = TokenCodec::new(config.token.clone());
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::new());

    let auth = Arc::new(AuthenticationService::new(
        directory.clone(),
        hasher.clone(),
        codec.clone(),
        store.clone(),
        config.password.clone(),
        config.logout_all_revokes_access,
    ));

    auth.bootstrap_admin(&config.admin).await?;

    let resolver = Arc::new(FederatedIdentityResolver::new(
        config.providers.clone(),
        Duration::from_secs(config.provider_timeout_seconds),
        auth.clone(),
        directory,
        hasher,
    )?);

    let authenticator = Arc::new(RequestAuthenticator::new(
        codec,
        store,
        config.logout_all_revokes_access,
    ));

    Ok(AuthStack {
        auth,
        resolver,
        authenticator,
    })
}
