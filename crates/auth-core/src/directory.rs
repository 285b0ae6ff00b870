//! User directory boundary
//!
//! Persistent account storage lives outside this crate; the service talks to
//! it through [`UserDirectory`]. [`MemoryUserDirectory`] backs tests and
//! small embedded deployments, and enforces the email/phone uniqueness
//! constraint the federated upsert relies on as its backstop.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::types::Principal;

#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("{field} already in use")]
    Duplicate { field: &'static str },

    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

/// Account storage interface
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, DirectoryError>;

    /// `identifier` is an email address or a phone number.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, DirectoryError>;

    async fn exists_by_phone(&self, phone: &str) -> Result<bool, DirectoryError>;

    /// Insert or update. Fails with [`DirectoryError::Duplicate`] when a
    /// different principal already holds the email or phone.
    async fn save(&self, principal: Principal) -> Result<Principal, DirectoryError>;
}

/// In-memory directory
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<Uuid, Principal>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.users.lock().len()
    }
}

impl Default for MemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, DirectoryError> {
        Ok(self.users.lock().get(&id).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|user| {
                user.email.as_deref() == Some(identifier)
                    || user.phone.as_deref() == Some(identifier)
            })
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|user| user.email.as_deref() == Some(email))
            .cloned())
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .users
            .lock()
            .values()
            .any(|user| user.email.as_deref() == Some(email)))
    }

    async fn exists_by_phone(&self, phone: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .users
            .lock()
            .values()
            .any(|user| user.phone.as_deref() == Some(phone)))
    }

    async fn save(&self, mut principal: Principal) -> Result<Principal, DirectoryError> {
        // Uniqueness check and insert under one lock: this is the constraint
        // concurrent federated signups race against.
        let mut users = self.users.lock();

        if let Some(email) = principal.email.as_deref() {
            if users
                .values()
                .any(|other| other.id != principal.id && other.email.as_deref() == Some(email))
            {
                return Err(DirectoryError::Duplicate { field: "email" });
            }
        }
        if let Some(phone) = principal.phone.as_deref() {
            if users
                .values()
                .any(|other| other.id != principal.id && other.phone.as_deref() == Some(phone))
            {
                return Err(DirectoryError::Duplicate { field: "phone" });
            }
        }

        principal.updated_at = Utc::now();
        users.insert(principal.id, principal.clone());
        Ok(principal)
    }
}
