//! Federated identity resolution
//!
//! Exchanges an authorization code with a configured provider, normalizes
//! the provider profile and upserts a local principal keyed by email, then
//! issues tokens through the same path as `login`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use token_core::Role;

use crate::directory::{DirectoryError, UserDirectory};
use crate::error::{AuthError, Result};
use crate::password::PasswordHasher;
use crate::service::AuthenticationService;
use crate::types::{AuthResponse, Principal};

/// Provider-specific profile shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    Facebook,
}

/// A configured identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub user_info_uri: String,
}

/// Normalized provider profile. Transient: used once for the upsert, then
/// discarded.
#[derive(Debug, Clone)]
pub struct FederatedProfile {
    pub provider: String,
    pub provider_user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderTokenResponse {
    access_token: Option<String>,
    id_token: Option<String>,
}

pub struct FederatedIdentityResolver {
    providers: HashMap<String, ProviderConfig>,
    http: reqwest::Client,
    auth: Arc<AuthenticationService>,
    directory: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
}

impl FederatedIdentityResolver {
    pub fn new(
        providers: HashMap<String, ProviderConfig>,
        timeout: Duration,
        auth: Arc<AuthenticationService>,
        directory: Arc<dyn UserDirectory>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Result<Self> {
        // Provider endpoints are the only unbounded-latency dependency; the
        // timeout applies to every outbound call. Dropping the caller's
        // future cancels any in-flight request.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Config(format!("http client: {err}")))?;

        Ok(Self {
            providers,
            http,
            auth,
            directory,
            hasher,
        })
    }

    pub async fn handle_callback(
        &self,
        provider_id: &str,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AuthResponse> {
        let provider = self
            .providers
            .get(provider_id)
            .ok_or_else(|| AuthError::UnknownProvider(provider_id.to_string()))?;

        let tokens = self.exchange_code(provider, code, redirect_uri).await?;
        let profile = self.fetch_profile(provider_id, provider, &tokens).await?;
        let principal = self.upsert_principal(&profile).await?;

        info!(user_id = %principal.id, provider = provider_id, "federated login");
        self.auth.issue_session(&principal).await
    }

    async fn exchange_code(
        &self,
        provider: &ProviderConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderTokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
        ];

        let response = self.post_form_with_retry(&provider.token_uri, &params).await?;
        if !response.status().is_success() {
            return Err(AuthError::ProviderExchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let tokens: ProviderTokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::ProviderExchange(format!("unreadable token response: {err}")))?;

        if tokens.access_token.is_none() && tokens.id_token.is_none() {
            return Err(AuthError::ProviderExchange(
                "no access or identity token in response".to_string(),
            ));
        }
        Ok(tokens)
    }

    /// One retry on transport errors only; HTTP error statuses are final.
    async fn post_form_with_retry(
        &self,
        uri: &str,
        params: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        match self.http.post(uri).form(params).send().await {
            Ok(response) => Ok(response),
            Err(err) if err.is_timeout() || err.is_connect() => {
                warn!(%err, "provider token endpoint unreachable, retrying once");
                self.http
                    .post(uri)
                    .form(params)
                    .send()
                    .await
                    .map_err(|err| {
                        AuthError::ProviderExchange(format!("token endpoint unreachable: {err}"))
                    })
            }
            Err(err) => Err(AuthError::ProviderExchange(format!(
                "token request failed: {err}"
            ))),
        }
    }

    async fn fetch_profile(
        &self,
        provider_id: &str,
        provider: &ProviderConfig,
        tokens: &ProviderTokenResponse,
    ) -> Result<FederatedProfile> {
        let access_token = tokens.access_token.as_deref().ok_or_else(|| {
            AuthError::ProviderExchange("no access token for the profile fetch".to_string())
        })?;

        match provider.kind {
            ProviderKind::Google => {
                self.fetch_google_profile(provider_id, provider, access_token)
                    .await
            }
            ProviderKind::Facebook => {
                self.fetch_facebook_profile(provider_id, provider, access_token)
                    .await
            }
        }
    }

    async fn fetch_google_profile(
        &self,
        provider_id: &str,
        provider: &ProviderConfig,
        access_token: &str,
    ) -> Result<FederatedProfile> {
        let payload = self
            .get_json(
                self.http
                    .get(&provider.user_info_uri)
                    .bearer_auth(access_token),
            )
            .await?;

        let sub = string_field(&payload, "sub")
            .ok_or_else(|| AuthError::ProviderExchange("userinfo missing subject".to_string()))?;
        let email = string_field(&payload, "email").ok_or(AuthError::MissingProviderEmail)?;

        Ok(FederatedProfile {
            provider: provider_id.to_string(),
            provider_user_id: sub,
            email,
            name: string_field(&payload, "name"),
            picture: string_field(&payload, "picture"),
        })
    }

    async fn fetch_facebook_profile(
        &self,
        provider_id: &str,
        provider: &ProviderConfig,
        access_token: &str,
    ) -> Result<FederatedProfile> {
        // Graph API style: explicit field list, token as a query parameter.
        let payload = self
            .get_json(self.http.get(&provider.user_info_uri).query(&[
                ("fields", "id,name,email,picture"),
                ("access_token", access_token),
            ]))
            .await?;

        let id = match payload.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(AuthError::ProviderExchange(
                    "profile response missing id".to_string(),
                ));
            }
        };
        let email = string_field(&payload, "email").ok_or(AuthError::MissingProviderEmail)?;
        let picture = payload
            .pointer("/picture/data/url")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(FederatedProfile {
            provider: provider_id.to_string(),
            provider_user_id: id,
            email,
            name: string_field(&payload, "name"),
            picture,
        })
    }

    async fn get_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|err| AuthError::ProviderExchange(format!("userinfo request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(AuthError::ProviderExchange(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|err| AuthError::ProviderExchange(format!("unreadable userinfo: {err}")))
    }

    /// Find-or-create by email. There is no locking here: when two first-time
    /// callbacks race, the directory's uniqueness constraint rejects one
    /// create, which is then retried as a lookup.
    async fn upsert_principal(&self, profile: &FederatedProfile) -> Result<Principal> {
        if let Some(existing) = self.directory.find_by_email(&profile.email).await? {
            return self.reuse_existing(existing, profile).await;
        }

        // Local password login is never possible for this account until the
        // user sets one; the hash is of a throwaway random value.
        let unusable_hash = self.hasher.hash(&Uuid::new_v4().to_string()).await?;
        let full_name = profile
            .name
            .clone()
            .unwrap_or_else(|| profile.email.clone());
        let principal = Principal::new(
            full_name,
            Some(profile.email.clone()),
            None,
            unusable_hash,
            Role::User,
        );

        match self.directory.save(principal).await {
            Ok(saved) => {
                info!(user_id = %saved.id, provider = %profile.provider, "created principal for federated identity");
                Ok(saved)
            }
            Err(DirectoryError::Duplicate { .. }) => {
                debug!("concurrent federated signup, reloading existing principal");
                let existing = self
                    .directory
                    .find_by_email(&profile.email)
                    .await?
                    .ok_or(AuthError::UserNotFound)?;
                self.reuse_existing(existing, profile).await
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn reuse_existing(
        &self,
        mut principal: Principal,
        profile: &FederatedProfile,
    ) -> Result<Principal> {
        if !principal.active {
            return Err(AuthError::AccountDisabled);
        }

        // Backfill a display name the account never had.
        if principal.full_name.is_empty() {
            if let Some(name) = &profile.name {
                principal.full_name = name.clone();
                principal = self.directory.save(principal).await?;
            }
        }
        Ok(principal)
    }
}

fn string_field(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_field_rejects_blank_and_missing() {
        let payload = serde_json::json!({"email": "  ", "name": "Alice", "count": 3});
        assert_eq!(string_field(&payload, "email"), None);
        assert_eq!(string_field(&payload, "missing"), None);
        assert_eq!(string_field(&payload, "count"), None);
        assert_eq!(string_field(&payload, "name").as_deref(), Some("Alice"));
    }

    #[test]
    fn provider_kind_deserializes_lowercase() {
        let kind: ProviderKind = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(kind, ProviderKind::Google);
        let kind: ProviderKind = serde_json::from_str("\"facebook\"").unwrap();
        assert_eq!(kind, ProviderKind::Facebook);
    }
}
