//! Checkout client error types.

/// Errors from checkout processor calls.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The processor returned a non-2xx status.
    #[error("checkout processor {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
