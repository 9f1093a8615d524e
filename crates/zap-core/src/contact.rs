//! # Contact Data
//!
//! Email is the principal identity in this system: authentication yields an
//! email, roles are keyed by email, and riders are matched by email.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A normalized (trimmed, lowercase) email address.
///
/// Only the structural minimum is checked: a non-empty local part, a single
/// `@`, and a domain containing a dot. Deliverability is not our concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalize an email address.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = value.as_ref();
        let normalized = raw.trim().to_ascii_lowercase();
        let invalid = || ValidationError::InvalidEmail(raw.to_string());

        let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
        if local.is_empty()
            || domain.contains('@')
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || normalized.chars().any(char::is_whitespace)
        {
            return Err(invalid());
        }
        Ok(Self(normalized))
    }

    /// Access the email string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}
