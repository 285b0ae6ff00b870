//! Refresh-session and revocation storage
//!
//! All key naming and TTL handling for the shared backend lives here; no
//! other module constructs backend keys.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::fingerprint::token_fingerprint;
use crate::kv::KeyValueStore;

const REFRESH_SESSION_PREFIX: &str = "refresh_token:";
const BLACKLIST_PREFIX: &str = "blacklist:";
const LOGOUT_BARRIER_PREFIX: &str = "logout_barrier:";

/// Token-lifecycle storage over a TTL key-value backend
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Stores the subject's current refresh token, replacing any previous
    /// session. At most one refresh session exists per subject.
    pub async fn put_refresh_session(
        &self,
        subject: &str,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.backend
            .put(&refresh_session_key(subject), token, ttl)
            .await?;
        debug!(%subject, "stored refresh session");
        Ok(())
    }

    pub async fn get_refresh_session(&self, subject: &str) -> Result<Option<String>, StoreError> {
        self.backend.get(&refresh_session_key(subject)).await
    }

    /// Claims the subject's refresh session if it still holds `presented`.
    ///
    /// This is a single atomic compare-and-delete on the session key: of any
    /// number of concurrent callers presenting the same token, exactly one
    /// observes `true` and may rotate.
    pub async fn take_refresh_session(
        &self,
        subject: &str,
        presented: &str,
    ) -> Result<bool, StoreError> {
        self.backend
            .compare_and_delete(&refresh_session_key(subject), presented)
            .await
    }

    pub async fn delete_refresh_session(&self, subject: &str) -> Result<(), StoreError> {
        self.backend.delete(&refresh_session_key(subject)).await?;
        debug!(%subject, "deleted refresh session");
        Ok(())
    }

    /// Marks an access token revoked for the remainder of its life. Once the
    /// TTL elapses the entry vanishes, at which point expiry and revocation
    /// are indistinguishable to the authenticator.
    pub async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let key = format!("{BLACKLIST_PREFIX}{}", token_fingerprint(token));
        self.backend.put(&key, "revoked", ttl).await?;
        debug!("blacklisted access token");
        Ok(())
    }

    pub async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        let key = format!("{BLACKLIST_PREFIX}{}", token_fingerprint(token));
        Ok(self.backend.get(&key).await?.is_some())
    }

    /// Records a logout-everywhere barrier: access tokens issued at or before
    /// `issued_before` are to be treated as revoked while the entry lives.
    pub async fn set_revocation_barrier(
        &self,
        subject: &str,
        issued_before: i64,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.backend
            .put(&barrier_key(subject), &issued_before.to_string(), ttl)
            .await?;
        debug!(%subject, "set revocation barrier");
        Ok(())
    }

    pub async fn revocation_barrier(&self, subject: &str) -> Result<Option<i64>, StoreError> {
        let Some(raw) = self.backend.get(&barrier_key(subject)).await? else {
            return Ok(None);
        };
        match raw.parse::<i64>() {
            Ok(barrier) => Ok(Some(barrier)),
            Err(_) => {
                warn!(%subject, "unreadable revocation barrier entry, ignoring");
                Ok(None)
            }
        }
    }

    /// Revokes the subject's refresh session. Access tokens already issued to
    /// other devices stay valid until expiry unless the caller also sets a
    /// revocation barrier.
    pub async fn revoke_all(&self, subject: &str) -> Result<(), StoreError> {
        self.delete_refresh_session(subject).await?;
        info!(%subject, "revoked refresh session");
        Ok(())
    }
}

fn refresh_session_key(subject: &str) -> String {
    format!("{REFRESH_SESSION_PREFIX}{subject}")
}

fn barrier_key(subject: &str) -> String {
    format!("{LOGOUT_BARRIER_PREFIX}{subject}")
}
