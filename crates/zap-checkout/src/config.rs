//! Checkout processor configuration.
//!
//! Defaults point at the production processor. Override the base URL for
//! staging or for a local mock server in tests.

use url::Url;

/// Default processor base URL.
pub const DEFAULT_API_URL: &str = "https://api.stripe.com";

/// Configuration for the checkout processor client.
///
/// Custom `Debug` implementation redacts the `secret_key` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct CheckoutConfig {
    /// Processor base URL. Default: <https://api.stripe.com>
    pub api_url: Url,
    /// Secret API key, sent as a bearer token.
    pub secret_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for CheckoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutConfig")
            .field("api_url", &self.api_url)
            .field("secret_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `STRIPE_SECRET_KEY` (required)
    /// - `STRIPE_API_URL` (default: `https://api.stripe.com`)
    /// - `STRIPE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingSecretKey)?;

        Ok(Self {
            api_url: env_url("STRIPE_API_URL", DEFAULT_API_URL)?,
            secret_key,
            timeout_secs: std::env::var("STRIPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Create a configuration pointing at a local mock server.
    pub fn local_mock(base_url: &str, secret_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: Url::parse(base_url)
                .map_err(|e| ConfigError::InvalidUrl(base_url.to_string(), e.to_string()))?,
            secret_key: secret_key.to_string(),
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("STRIPE_SECRET_KEY environment variable is required")]
    MissingSecretKey,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = CheckoutConfig::local_mock("http://127.0.0.1:9100", "sk_test_1").unwrap();
        assert_eq!(cfg.api_url.as_str(), "http://127.0.0.1:9100/");
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn debug_redacts_secret_key() {
        let cfg = CheckoutConfig::local_mock("http://127.0.0.1:9100", "sk_live_secret").unwrap();
        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk_live_secret"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("ZAP_NONEXISTENT_VAR_4711", DEFAULT_API_URL).unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/");
    }

    #[test]
    fn local_mock_rejects_invalid_url() {
        assert!(CheckoutConfig::local_mock("not a url", "k").is_err());
    }
}
