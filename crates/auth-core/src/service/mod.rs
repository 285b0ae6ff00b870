//! Authentication orchestration
//!
//! Register, login, refresh rotation, logout and profile lookup. All token
//! issuing funnels through [`AuthenticationService::issue_session`] so every
//! entry point (password login, registration, federation) persists the
//! refresh session the same way.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use token_core::{Role, TokenClaims, TokenCodec, TokenStore};

use crate::config::AdminBootstrap;
use crate::directory::{DirectoryError, UserDirectory};
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::types::{AuthResponse, Principal, RegisterRequest, UserProfile, UserSummary};
use crate::validation::{self, PasswordPolicy};

pub struct AuthenticationService {
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    codec: TokenCodec,
    store: TokenStore,
    password_policy: PasswordPolicy,
    logout_all_revokes_access: bool,
}

impl AuthenticationService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHasher>,
        codec: TokenCodec,
        store: TokenStore,
        password_policy: PasswordPolicy,
        logout_all_revokes_access: bool,
    ) -> Self {
        Self {
            directory,
            hasher,
            codec,
            store,
            password_policy,
            logout_all_revokes_access,
        }
    }

    /// Creates a new account and signs it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse> {
        if request.email.is_none() && request.phone.is_none() {
            return Err(AuthError::MissingIdentifier);
        }

        if let Some(email) = request.email.as_deref() {
            validation::validate_email(email)?;
            if self.directory.exists_by_email(email).await? {
                return Err(AuthError::DuplicateIdentifier { field: "email" });
            }
        }
        if let Some(phone) = request.phone.as_deref() {
            validation::validate_phone(phone)?;
            if self.directory.exists_by_phone(phone).await? {
                return Err(AuthError::DuplicateIdentifier { field: "phone" });
            }
        }

        self.password_policy.validate(&request.password)?;
        let password_hash = self.hasher.hash(&request.password).await?;

        let principal = Principal::new(
            request.full_name,
            request.email,
            request.phone,
            password_hash,
            Role::User,
        );
        // The directory's uniqueness constraint backstops the exists checks
        // above against concurrent registrations.
        let principal = self.directory.save(principal).await?;

        info!(user_id = %principal.id, "user registered");
        self.issue_session(&principal).await
    }

    /// Signs in with an email address or phone number.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse> {
        let principal = self
            .directory
            .find_by_identifier(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !principal.active {
            return Err(AuthError::AccountDisabled);
        }

        if !self
            .hasher
            .verify(password, &principal.password_hash)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %principal.id, "user logged in");
        self.issue_session(&principal).await
    }

    /// Rotates a refresh token: the presented token is consumed and a new
    /// pair is issued.
    ///
    /// Rotation is single-use with no rollback. The stored session is claimed
    /// with an atomic compare-and-delete before anything is issued, so of two
    /// concurrent calls presenting the same token exactly one wins; the loser
    /// (and any replayed token) fails as revoked.
    pub async fn refresh(&self, presented: &str) -> Result<AuthResponse> {
        let claims = self.codec.verify(presented)?;
        let TokenClaims::Refresh { sub, .. } = claims else {
            return Err(AuthError::WrongTokenType { expected: "refresh" });
        };

        if !self.store.take_refresh_session(&sub, presented).await? {
            return Err(AuthError::TokenRevoked);
        }

        let user_id = sub.parse::<Uuid>().map_err(|_| AuthError::InvalidSubject)?;
        let principal = self
            .directory
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        debug!(user_id = %principal.id, "refresh token rotated");
        self.issue_session(&principal).await
    }

    /// Revokes the current session: blacklists the access token for its
    /// remaining lifetime (when one is presented and still valid) and deletes
    /// the refresh session.
    pub async fn logout(&self, access_token: Option<&str>, subject: &str) -> Result<()> {
        if let Some(token) = access_token {
            match self.codec.verify(token) {
                Ok(claims @ TokenClaims::Access { .. }) => {
                    let ttl = claims.remaining_ttl();
                    if !ttl.is_zero() {
                        self.store.blacklist(token, ttl).await?;
                    }
                }
                Ok(_) => debug!("logout presented a non-access token, skipping blacklist"),
                Err(err) => debug!(%err, "logout presented an unusable token, skipping blacklist"),
            }
        }

        self.store.delete_refresh_session(subject).await?;
        info!(%subject, "user logged out");
        Ok(())
    }

    /// Revokes the subject's refresh session on every device.
    ///
    /// Outstanding access tokens stay valid until natural expiry unless
    /// `logout_all_revokes_access` is configured, in which case a revocation
    /// barrier bars every access token issued up to now.
    pub async fn logout_all(&self, subject: &str) -> Result<()> {
        self.store.revoke_all(subject).await?;
        if self.logout_all_revokes_access {
            self.store
                .set_revocation_barrier(subject, Utc::now().timestamp(), self.codec.access_ttl())
                .await?;
        }
        info!(%subject, "user logged out everywhere");
        Ok(())
    }

    pub async fn current_profile(&self, subject: &str) -> Result<UserProfile> {
        let id = subject.parse::<Uuid>().map_err(|_| AuthError::InvalidSubject)?;
        let principal = self
            .directory
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok(UserProfile::from(&principal))
    }

    /// Shared issuing path: signs a token pair, persists the refresh session
    /// (replacing any previous one) and builds the response.
    pub async fn issue_session(&self, principal: &Principal) -> Result<AuthResponse> {
        let subject = principal.id.to_string();
        let access_token =
            self.codec
                .issue_access(&subject, principal.email.as_deref(), principal.role)?;
        let refresh_token = self.codec.issue_refresh(&subject)?;

        self.store
            .put_refresh_session(&subject, &refresh_token, self.codec.refresh_ttl())
            .await?;

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.codec.config().access_ttl_seconds,
            user: UserSummary::from(principal),
        })
    }

    /// Idempotent administrator bootstrap from configuration. Skipped when
    /// the email or password is unset, or the account already exists.
    pub async fn bootstrap_admin(&self, bootstrap: &AdminBootstrap) -> Result<Option<Principal>> {
        let (Some(email), Some(password)) = (
            bootstrap.email.as_deref().filter(|s| !s.is_empty()),
            bootstrap.password.as_deref().filter(|s| !s.is_empty()),
        ) else {
            info!("admin bootstrap skipped: email or password not configured");
            return Ok(None);
        };

        if self.directory.find_by_email(email).await?.is_some() {
            info!(%email, "admin user already exists");
            return Ok(None);
        }

        let password_hash = self.hasher.hash(password).await?;
        let principal = Principal::new(
            bootstrap.full_name.clone(),
            Some(email.to_string()),
            bootstrap.phone.clone().filter(|s| !s.is_empty()),
            password_hash,
            Role::Admin,
        );

        match self.directory.save(principal).await {
            Ok(saved) => {
                info!(%email, "admin user created");
                Ok(Some(saved))
            }
            // Lost a startup race against another instance; the account is
            // there, which is all bootstrap guarantees.
            Err(DirectoryError::Duplicate { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
