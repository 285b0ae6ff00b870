//! Input validation for registration

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{AuthError, Result};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").unwrap());

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::InvalidIdentifierFormat { field: "email" })
    }
}

pub fn validate_phone(phone: &str) -> Result<()> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(AuthError::InvalidIdentifierFormat { field: "phone" })
    }
}

/// Password policy applied at registration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: true,
            require_lowercase: true,
            require_numbers: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    pub fn validate(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_length {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters",
                self.min_length
            )));
        }
        if password.chars().count() > self.max_length {
            return Err(AuthError::WeakPassword(format!(
                "must not exceed {} characters",
                self.max_length
            )));
        }

        let has_upper = password.chars().any(|c| c.is_uppercase());
        let has_lower = password.chars().any(|c| c.is_lowercase());
        let has_digit = password.chars().any(|c| c.is_numeric());
        let has_special = password.chars().any(|c| !c.is_alphanumeric());

        if self.require_uppercase && !has_upper {
            return Err(AuthError::WeakPassword(
                "must contain an uppercase letter".to_string(),
            ));
        }
        if self.require_lowercase && !has_lower {
            return Err(AuthError::WeakPassword(
                "must contain a lowercase letter".to_string(),
            ));
        }
        if self.require_numbers && !has_digit {
            return Err(AuthError::WeakPassword("must contain a number".to_string()));
        }
        if self.require_special && !has_special {
            return Err(AuthError::WeakPassword(
                "must contain a special character".to_string(),
            ));
        }

        Ok(())
    }
}
