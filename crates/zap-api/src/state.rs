//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! Holds the wired [`Dispatch`] components, the service configuration, the
//! request counters, and the Postgres pool when one is configured. All
//! domain state lives behind the repository traits; nothing here is cached.

use std::sync::Arc;

use sqlx::PgPool;
use zap_dispatch::memory::MemoryBackend;
use zap_dispatch::{Dispatch, DispatchError, DispatchSettings, PaymentProcessor, Repositories};

use crate::config::AppConfig;
use crate::db::{self, PgBackend};
use crate::middleware::metrics::ApiMetrics;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatch: Arc<Dispatch>,
    pub config: Arc<AppConfig>,
    pub metrics: ApiMetrics,
    /// `None` when running on in-memory storage.
    pub db_pool: Option<PgPool>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("db_pool", &self.db_pool.as_ref().map(|_| "PgPool"))
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        processor: Option<Arc<dyn PaymentProcessor>>,
        db_pool: Option<PgPool>,
    ) -> Self {
        let settings = DispatchSettings {
            policy: config.policy,
            checkout: config.checkout.clone(),
        };
        Self {
            dispatch: Arc::new(Dispatch::new(repos, processor, settings)),
            config: Arc::new(config),
            metrics: ApiMetrics::new(),
            db_pool,
        }
    }

    /// State over a fresh in-memory backend.
    pub fn in_memory(config: AppConfig, processor: Option<Arc<dyn PaymentProcessor>>) -> Self {
        Self::new(config, MemoryBackend::repositories(), processor, None)
    }

    /// Connect to Postgres when `DATABASE_URL` is configured, otherwise fall
    /// back to in-memory storage.
    pub async fn connect(
        config: AppConfig,
        processor: Option<Arc<dyn PaymentProcessor>>,
    ) -> Result<Self, sqlx::Error> {
        match db::init_pool(config.database_url.as_deref()).await? {
            Some(pool) => {
                let repos = PgBackend::new(pool.clone()).into_repositories();
                Ok(Self::new(config, repos, processor, Some(pool)))
            }
            None => Ok(Self::in_memory(config, processor)),
        }
    }

    /// Promote every configured admin email.
    pub async fn seed_admins(&self) -> Result<(), DispatchError> {
        self.dispatch.users.seed_admins(&self.config.admin_emails).await
    }

    /// Whether bearer tokens are checked.
    pub fn auth_enabled(&self) -> bool {
        self.config.jwt_secret.is_some()
    }
}
