//! Compact bearer token issuance and verification

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// Subject role carried in access claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// Token claims, tagged by the `type` claim
///
/// The variant tag is decoded before anything else; variant-specific fields
/// only exist on the matched arm, so a consumption site that needs one
/// variant rejects the other by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenClaims {
    Access {
        sub: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        role: Role,
        iat: i64,
        exp: i64,
        /// Unique token id. Two otherwise-identical tokens signed within the
        /// same second must still be distinct strings.
        jti: String,
    },
    Refresh {
        sub: String,
        iat: i64,
        exp: i64,
        jti: String,
    },
}

impl TokenClaims {
    pub fn subject(&self) -> &str {
        match self {
            TokenClaims::Access { sub, .. } | TokenClaims::Refresh { sub, .. } => sub,
        }
    }

    pub fn issued_at(&self) -> i64 {
        match self {
            TokenClaims::Access { iat, .. } | TokenClaims::Refresh { iat, .. } => *iat,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            TokenClaims::Access { exp, .. } | TokenClaims::Refresh { exp, .. } => *exp,
        }
    }

    /// Remaining lifetime from now; zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        let secs = self.expires_at() - Utc::now().timestamp();
        if secs <= 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(secs as u64)
        }
    }
}

/// Codec configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HMAC secret. Every deployment must override the default.
    pub secret: String,
    pub access_ttl_seconds: u64,
    pub refresh_ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "dev-only-signing-secret-change-me".to_string(),
            access_ttl_seconds: 900,       // 15 minutes
            refresh_ttl_seconds: 604_800,  // 7 days
        }
    }
}

/// Signs and verifies compact bearer tokens
///
/// Wire format: three base64url segments joined by `.` — header, payload,
/// HMAC-SHA256 signature over the first two. Verification checks the
/// signature before trusting any payload field, and expiry with zero leeway.
/// No side effects; cheap to clone.
#[derive(Clone)]
pub struct TokenCodec {
    config: TokenConfig,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            config,
            encoding_key: Arc::new(encoding_key),
            decoding_key: Arc::new(decoding_key),
            header: Header::new(Algorithm::HS256),
            validation,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.config.access_ttl_seconds)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.config.refresh_ttl_seconds)
    }

    pub fn issue_access(
        &self,
        subject: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims::Access {
            sub: subject.to_string(),
            email: email.map(str::to_string),
            role,
            iat: now,
            exp: now + self.config.access_ttl_seconds as i64,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    pub fn issue_refresh(&self, subject: &str) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims::Refresh {
            sub: subject.to_string(),
            iat: now,
            exp: now + self.config.refresh_ttl_seconds as i64,
            jti: Uuid::new_v4().to_string(),
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::from)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|err| TokenError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    fn codec() -> TokenCodec {
        TokenCodec::new(TokenConfig::default())
    }

    #[test]
    fn access_round_trip() {
        let codec = codec();
        let subject = uuid::Uuid::new_v4().to_string();
        let token = codec
            .issue_access(&subject, Some("alice@example.com"), Role::Admin)
            .unwrap();

        match codec.verify(&token).unwrap() {
            TokenClaims::Access {
                sub,
                email,
                role,
                iat,
                exp,
                ..
            } => {
                assert_eq!(sub, subject);
                assert_eq!(email.as_deref(), Some("alice@example.com"));
                assert_eq!(role, Role::Admin);
                assert_eq!(exp - iat, 900);
            }
            other => panic!("expected access claims, got {other:?}"),
        }
    }

    #[test]
    fn refresh_round_trip_has_no_identity_fields() {
        let codec = codec();
        let token = codec.issue_refresh("subject-1").unwrap();

        let claims = codec.verify(&token).unwrap();
        assert!(matches!(claims, TokenClaims::Refresh { .. }));
        assert_eq!(claims.subject(), "subject-1");

        // The payload segment must not leak role or email.
        let payload = token.split('.').nth(1).unwrap();
        let json = String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert!(!json.contains("role"));
        assert!(!json.contains("email"));
    }

    #[test]
    fn zero_ttl_token_is_expired() {
        let codec = TokenCodec::new(TokenConfig {
            access_ttl_seconds: 0,
            ..TokenConfig::default()
        });
        let token = codec.issue_access("s", None, Role::User).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let codec = codec();
        let token = codec.issue_access("s", None, Role::User).unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let mut signature = parts[2].clone();
        let last = signature.pop().unwrap();
        signature.push(if last == 'A' { 'B' } else { 'A' });
        parts[2] = signature;

        let tampered = parts.join(".");
        assert_eq!(codec.verify(&tampered), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec();
        let token = codec.issue_access("s", None, Role::User).unwrap();

        let forged = serde_json::json!({
            "type": "access",
            "sub": "someone-else",
            "role": "ADMIN",
            "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 3600,
        });
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = URL_SAFE_NO_PAD.encode(forged.to_string());
        let forged_token = parts.join(".");

        assert_eq!(
            codec.verify(&forged_token),
            Err(TokenError::SignatureInvalid)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = codec().issue_refresh("s").unwrap();
        let other = TokenCodec::new(TokenConfig {
            secret: "a-completely-different-secret".to_string(),
            ..TokenConfig::default()
        });
        assert_eq!(other.verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec();
        assert!(matches!(
            codec.verify("not-a-token"),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            codec.verify("a.b.c"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_claim_type_is_malformed() {
        let codec = codec();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "type": "session",
                "sub": "s",
                "iat": Utc::now().timestamp(),
                "exp": Utc::now().timestamp() + 60,
            })
            .to_string(),
        );
        // Signature is checked first, so sign the forged payload properly.
        let signed = {
            use jsonwebtoken::crypto::sign;
            let message = format!("{header}.{payload}");
            let key = EncodingKey::from_secret(TokenConfig::default().secret.as_bytes());
            let signature = sign(message.as_bytes(), &key, Algorithm::HS256).unwrap();
            format!("{message}.{signature}")
        };
        assert!(matches!(
            codec.verify(&signed),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn remaining_ttl_is_clamped_at_zero() {
        let now = Utc::now().timestamp();
        let expired = TokenClaims::Refresh {
            sub: "s".to_string(),
            iat: now - 120,
            exp: now - 60,
            jti: "t1".to_string(),
        };
        assert_eq!(expired.remaining_ttl(), Duration::ZERO);

        let live = TokenClaims::Refresh {
            sub: "s".to_string(),
            iat: now,
            exp: now + 60,
            jti: "t2".to_string(),
        };
        assert!(live.remaining_ttl() > Duration::from_secs(55));
    }

    #[test]
    fn back_to_back_tokens_are_distinct() {
        // Signing is deterministic over the claims, so same-second issuance
        // must still produce different strings for rotation to mean anything.
        let codec = codec();
        let first = codec.issue_refresh("s").unwrap();
        let second = codec.issue_refresh("s").unwrap();
        assert_ne!(first, second);
    }
}
