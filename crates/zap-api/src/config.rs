//! # Service Configuration
//!
//! Read once at startup from environment variables. Processor settings
//! (`STRIPE_*`) are loaded separately by `zap_checkout::CheckoutConfig`.

use zap_core::Email;
use zap_dispatch::CheckoutSettings;
use zap_state::AssignmentPolicy;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Log output format selected by `ZAP_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Service configuration.
///
/// Custom `Debug` redacts the JWT secret and database URL.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Postgres URL. `None` runs on the in-memory backend.
    pub database_url: Option<String>,
    /// HS256 secret for bearer tokens. `None` disables authentication.
    pub jwt_secret: Option<String>,
    /// Emails promoted to admin at startup.
    pub admin_emails: Vec<Email>,
    pub policy: AssignmentPolicy,
    pub checkout: CheckoutSettings,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            jwt_secret: None,
            admin_emails: Vec::new(),
            policy: AssignmentPolicy::default(),
            checkout: CheckoutSettings::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[REDACTED]"))
            .field("admin_emails", &self.admin_emails)
            .field("policy", &self.policy)
            .field("checkout", &self.checkout)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Variables:
    /// - `PORT` (default: 3000)
    /// - `DATABASE_URL` (unset: in-memory storage)
    /// - `ZAP_JWT_SECRET` (unset: authentication disabled)
    /// - `ZAP_ADMIN_EMAILS` (comma-separated)
    /// - `ZAP_ASSIGNMENT_POLICY` (`strict` or `override`, default `strict`)
    /// - `SITE_DOMAIN` (default: `http://localhost:5173`)
    /// - `ZAP_CURRENCY` (default: `usd`)
    /// - `ZAP_LOG_FORMAT` (`text` or `json`, default `text`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            None => defaults.port,
        };

        let admin_emails = match var("ZAP_ADMIN_EMAILS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Email::new(s).map_err(|_| ConfigError::Invalid("ZAP_ADMIN_EMAILS", s.to_string())))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let policy = match var("ZAP_ASSIGNMENT_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("ZAP_ASSIGNMENT_POLICY", raw))?,
            None => defaults.policy,
        };

        let log_format = match var("ZAP_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::Invalid("ZAP_LOG_FORMAT", other.to_string())),
        };

        let checkout = CheckoutSettings {
            site_domain: var("SITE_DOMAIN").unwrap_or(defaults.checkout.site_domain),
            currency: var("ZAP_CURRENCY")
                .map(|c| c.trim().to_lowercase())
                .unwrap_or(defaults.checkout.currency),
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            jwt_secret: var("ZAP_JWT_SECRET"),
            admin_emails,
            policy,
            checkout,
            log_format,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: \"{1}\"")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert!(cfg.database_url.is_none());
        assert!(cfg.jwt_secret.is_none());
        assert!(cfg.admin_emails.is_empty());
        assert_eq!(cfg.policy, AssignmentPolicy::Strict);
        assert_eq!(cfg.checkout, CheckoutSettings::default());
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn reads_every_variable() {
        let cfg = load(&[
            ("PORT", "8081"),
            ("DATABASE_URL", "postgres://zap@localhost/zap"),
            ("ZAP_JWT_SECRET", "s3cret"),
            ("ZAP_ADMIN_EMAILS", " Ops@Example.com, boss@example.com ,"),
            ("ZAP_ASSIGNMENT_POLICY", "override"),
            ("SITE_DOMAIN", "https://zap.example.com"),
            ("ZAP_CURRENCY", "BDT"),
            ("ZAP_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8081);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://zap@localhost/zap"));
        assert_eq!(cfg.jwt_secret.as_deref(), Some("s3cret"));
        let admins: Vec<&str> = cfg.admin_emails.iter().map(Email::as_str).collect();
        assert_eq!(admins, ["ops@example.com", "boss@example.com"]);
        assert_eq!(cfg.policy, AssignmentPolicy::Override);
        assert_eq!(cfg.checkout.site_domain, "https://zap.example.com");
        assert_eq!(cfg.checkout.currency, "bdt");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = load(&[("ZAP_JWT_SECRET", "  "), ("DATABASE_URL", "")]).unwrap();
        assert!(cfg.jwt_secret.is_none());
        assert!(cfg.database_url.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::Invalid("PORT", _))));
        assert!(matches!(
            load(&[("ZAP_ASSIGNMENT_POLICY", "first-come")]),
            Err(ConfigError::Invalid("ZAP_ASSIGNMENT_POLICY", _))
        ));
        assert!(matches!(
            load(&[("ZAP_ADMIN_EMAILS", "not-an-email")]),
            Err(ConfigError::Invalid("ZAP_ADMIN_EMAILS", _))
        ));
        assert!(matches!(
            load(&[("ZAP_LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid("ZAP_LOG_FORMAT", _))
        ));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = load(&[
            ("ZAP_JWT_SECRET", "hunter2"),
            ("DATABASE_URL", "postgres://u:pw@db/zap"),
        ])
        .unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pw@db"));
    }
}
