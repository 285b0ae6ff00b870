//! Core types for auth-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use token_core::Role;
use uuid::Uuid;

/// User account as stored by the directory
///
/// Principals are never physically deleted by this core; deactivation flips
/// `active` and revokes sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(
        full_name: String,
        email: Option<String>,
        phone: Option<String>,
        password_hash: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            phone,
            full_name,
            password_hash,
            role,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

/// Issued token pair plus a user summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: String,
    pub role: Role,
}

impl From<&Principal> for UserSummary {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            email: principal.email.clone(),
            phone: principal.phone.clone(),
            full_name: principal.full_name.clone(),
            role: principal.role,
        }
    }
}

/// Profile view for the current subject
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub full_name: String,
    pub role: Role,
}

impl From<&Principal> for UserProfile {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            email: principal.email.clone(),
            phone: principal.phone.clone(),
            full_name: principal.full_name.clone(),
            role: principal.role,
        }
    }
}
