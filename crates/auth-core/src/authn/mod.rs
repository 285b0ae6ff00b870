//! Per-request bearer token gate
//!
//! Turns an incoming Authorization header into a trusted principal. This
//! layer never rejects a request: every token problem degrades to
//! [`AuthContext::Anonymous`] with a log line, and endpoint-level
//! authorization (outside this crate) decides what anonymous callers may
//! reach. Claims are trusted directly from the verified token — there is no
//! directory round trip, so a role change only takes effect at the subject's
//! next token issuance.

use tracing::{debug, warn};
use uuid::Uuid;

use token_core::{Role, TokenClaims, TokenCodec, TokenStore};

const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of request authentication
#[derive(Debug, Clone)]
pub enum AuthContext {
    Anonymous,
    Authenticated(AuthenticatedUser),
}

impl AuthContext {
    pub fn user(&self) -> Option<&AuthenticatedUser> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::Authenticated(_))
    }
}

/// Principal derived from a verified access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Role,
}

pub struct RequestAuthenticator {
    codec: TokenCodec,
    store: TokenStore,
    enforce_barrier: bool,
}

impl RequestAuthenticator {
    pub fn new(codec: TokenCodec, store: TokenStore, enforce_barrier: bool) -> Self {
        Self {
            codec,
            store,
            enforce_barrier,
        }
    }

    /// `authorization` is the raw Authorization header value, if any.
    pub async fn authenticate(&self, authorization: Option<&str>) -> AuthContext {
        let Some(header) = authorization else {
            return AuthContext::Anonymous;
        };
        let Some(token) = header.strip_prefix(BEARER_PREFIX) else {
            return AuthContext::Anonymous;
        };

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(%err, "rejected bearer token");
                return AuthContext::Anonymous;
            }
        };

        let TokenClaims::Access {
            sub,
            email,
            role,
            iat,
            ..
        } = claims
        else {
            debug!("bearer token is not an access token");
            return AuthContext::Anonymous;
        };

        match self.store.is_blacklisted(token).await {
            Ok(false) => {}
            Ok(true) => {
                debug!("bearer token is blacklisted");
                return AuthContext::Anonymous;
            }
            Err(err) => {
                warn!(%err, "blacklist check failed, treating request as anonymous");
                return AuthContext::Anonymous;
            }
        }

        if self.enforce_barrier {
            match self.store.revocation_barrier(&sub).await {
                Ok(Some(barrier)) if iat <= barrier => {
                    debug!("bearer token predates a logout-everywhere barrier");
                    return AuthContext::Anonymous;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "barrier check failed, treating request as anonymous");
                    return AuthContext::Anonymous;
                }
            }
        }

        let Ok(id) = sub.parse::<Uuid>() else {
            debug!("bearer token subject is not a valid id");
            return AuthContext::Anonymous;
        };

        AuthContext::Authenticated(AuthenticatedUser { id, email, role })
    }
}
