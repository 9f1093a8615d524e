//! # zap-checkout -- Typed client for the hosted-checkout processor
//!
//! Two calls against a Stripe-compatible REST API:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/v1/checkout/sessions` | Create a hosted checkout session (form-encoded) |
//! | GET    | `/v1/checkout/sessions/{id}` | Retrieve a session and its payment status |
//!
//! Requests authenticate with the secret key as a bearer token. Calls are
//! never retried here; callers decide whether a failed confirmation is
//! re-attempted.

pub mod config;
pub mod error;
pub mod types;

pub use config::CheckoutConfig;
pub use error::CheckoutError;
pub use types::{CheckoutSession, CreateSessionRequest, SessionPaymentStatus, SessionStatus};

use std::time::Duration;

use zap_core::CheckoutSessionId;

const SESSIONS_PATH: &str = "v1/checkout/sessions";

/// Client for the checkout processor.
#[derive(Debug, Clone)]
pub struct CheckoutClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl CheckoutClient {
    /// Create a new client from configuration.
    pub fn new(config: CheckoutConfig) -> Result<Self, CheckoutError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut auth =
                    reqwest::header::HeaderValue::from_str(&format!("Bearer {}", config.secret_key))
                        .map_err(|_| CheckoutError::Config(config::ConfigError::MissingSecretKey))?;
                auth.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, auth);
                headers
            })
            .build()
            .map_err(|e| CheckoutError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url: config.api_url,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), suffix)
    }

    /// Create a hosted checkout session.
    ///
    /// Calls `POST {base_url}/v1/checkout/sessions`.
    pub async fn create_checkout_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        let endpoint = "POST /checkout/sessions";
        let resp = self
            .http
            .post(self.url(SESSIONS_PATH))
            .form(&req.to_form())
            .send()
            .await
            .map_err(|e| CheckoutError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let session: CheckoutSession = decode(endpoint, resp).await?;
        tracing::debug!(session_id = %session.id, amount = req.amount_minor, "checkout session created");
        Ok(session)
    }

    /// Retrieve a checkout session.
    ///
    /// Calls `GET {base_url}/v1/checkout/sessions/{id}`.
    pub async fn retrieve_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, CheckoutError> {
        let endpoint = "GET /checkout/sessions/{id}";
        let encoded: String =
            url::form_urlencoded::byte_serialize(session_id.as_str().as_bytes()).collect();
        let resp = self
            .http
            .get(self.url(&format!("{SESSIONS_PATH}/{encoded}")))
            .send()
            .await
            .map_err(|e| CheckoutError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        let status: SessionStatus = decode(endpoint, resp).await?;
        tracing::debug!(
            session_id = %status.id,
            payment_status = status.payment_status.as_str(),
            "checkout session retrieved"
        );
        Ok(status)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<T, CheckoutError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        return Err(CheckoutError::ApiError {
            endpoint: endpoint.into(),
            status,
            body,
        });
    }

    resp.json().await.map_err(|e| CheckoutError::Deserialization {
        endpoint: endpoint.into(),
        source: e,
    })
}
