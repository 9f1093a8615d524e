//! # zap-api: Binary Entry Point
//!
//! Loads configuration, connects storage and the payment processor, and
//! serves the API.

use std::sync::Arc;

use anyhow::Context;
use zap_api::config::{AppConfig, LogFormat};
use zap_api::state::AppState;
use zap_checkout::config::ConfigError;
use zap_checkout::{CheckoutClient, CheckoutConfig};
use zap_dispatch::PaymentProcessor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let processor: Option<Arc<dyn PaymentProcessor>> = match CheckoutConfig::from_env() {
        Ok(checkout_config) => {
            let client = CheckoutClient::new(checkout_config).context("checkout client")?;
            tracing::info!("payment processor configured");
            Some(Arc::new(client))
        }
        Err(ConfigError::MissingSecretKey) => {
            tracing::warn!("STRIPE_SECRET_KEY not set. Checkout endpoints will return 503.");
            None
        }
        Err(e) => return Err(anyhow::Error::new(e).context("invalid checkout configuration")),
    };

    let port = config.port;
    let state = AppState::connect(config, processor)
        .await
        .context("database initialization failed")?;

    state.seed_admins().await.context("admin seeding failed")?;

    if !state.auth_enabled() {
        tracing::warn!(
            principal = zap_api::auth::DEV_ADMIN_EMAIL,
            "ZAP_JWT_SECRET not set, authentication is disabled and every request runs as admin"
        );
    }
    tracing::info!(policy = %state.config.policy, "assignment policy");

    let app = zap_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Zap API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
