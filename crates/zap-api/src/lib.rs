//! # zap-api: Axum API Service for Zap Dispatch
//!
//! HTTP surface over the `zap_dispatch` components: parcel creation and
//! lifecycle, rider onboarding and assignment, hosted checkout with
//! idempotent confirmation, and public tracking history.
//!
//! ## API Surface
//!
//! | Prefix | Module | Auth |
//! |---|---|---|
//! | `/v1/users/*` | [`routes::users`] | bearer |
//! | `/v1/parcels/*` | [`routes::parcels`] | bearer |
//! | `/v1/payments/*` | [`routes::payments`] | bearer |
//! | `/v1/riders/*` | [`routes::riders`] | bearer |
//! | `/v1/trackings/*` | [`routes::trackings`] | none |
//! | `/health/*`, `/metrics`, `/openapi.json` | this module, [`openapi`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (bearer routes only) → Handler
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

pub use error::AppError;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, metrics, the OpenAPI document and public tracking are
/// mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::parcels::router())
        .merge(routes::payments::router())
        .merge(routes::riders::router())
        .layer(from_fn_with_state(state.clone(), auth::auth_middleware));

    let public = Router::new()
        .merge(routes::trackings::router())
        .merge(openapi::router())
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics));

    let metrics_ext = state.metrics.clone();

    Router::new()
        .merge(public)
        .merge(api)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(metrics_ext))
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: checks the database when one is configured.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let Some(pool) = &state.db_pool else {
        return (StatusCode::OK, "ready");
    };
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
