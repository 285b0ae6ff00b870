//! Configuration for auth-core

use std::collections::HashMap;

use serde::Deserialize;
use token_core::TokenConfig;

use crate::error::{AuthError, Result};
use crate::oauth::ProviderConfig;
use crate::validation::PasswordPolicy;

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub password: PasswordPolicy,
    /// OAuth providers keyed by provider id ("google", "facebook").
    pub providers: HashMap<String, ProviderConfig>,
    /// Timeout for provider token and userinfo calls.
    pub provider_timeout_seconds: u64,
    /// When set, logout-everywhere also bars outstanding access tokens via a
    /// revocation barrier. Off by default: with short access lifetimes the
    /// tokens age out on their own.
    pub logout_all_revokes_access: bool,
    pub admin: AdminBootstrap,
}

/// Optional administrator account created at startup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminBootstrap {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            password: PasswordPolicy::default(),
            providers: HashMap::new(),
            provider_timeout_seconds: 5,
            logout_all_revokes_access: false,
            admin: AdminBootstrap::default(),
        }
    }
}

impl Default for AdminBootstrap {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            full_name: "Admin".to_string(),
            phone: None,
        }
    }
}

impl AuthConfig {
    /// Layered load: `auth.toml` in the working directory (optional), then
    /// `AUTH__*` environment keys (for example `AUTH__TOKEN__SECRET`).
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name("auth").required(false))
            .add_source(config::Environment::with_prefix("AUTH").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|err| AuthError::Config(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::ProviderKind;

    #[test]
    fn defaults_are_usable() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.token.access_ttl_seconds, 900);
        assert_eq!(cfg.token.refresh_ttl_seconds, 604_800);
        assert_eq!(cfg.provider_timeout_seconds, 5);
        assert!(!cfg.logout_all_revokes_access);
        assert!(cfg.providers.is_empty());
        assert!(cfg.admin.email.is_none());
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let cfg: AuthConfig = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [token]
                secret = "file-secret"
                access_ttl_seconds = 300

                [admin]
                email = "root@x.com"
                password = "Sup3rSecret!"

                [providers.google]
                kind = "google"
                client_id = "cid"
                client_secret = "cs"
                token_uri = "https://oauth2.googleapis.com/token"
                user_info_uri = "https://openidconnect.googleapis.com/v1/userinfo"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.token.secret, "file-secret");
        assert_eq!(cfg.token.access_ttl_seconds, 300);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.token.refresh_ttl_seconds, 604_800);
        assert_eq!(cfg.password.min_length, 8);
        assert_eq!(cfg.admin.email.as_deref(), Some("root@x.com"));

        let google = cfg.providers.get("google").unwrap();
        assert_eq!(google.kind, ProviderKind::Google);
        assert_eq!(google.client_id, "cid");
    }
}
