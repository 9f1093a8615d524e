//! # Request Metrics
//!
//! Atomic request and error counters, shared through an Axum extension and
//! reported as JSON at `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use utoipa::ToSchema;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    request_count: Arc<AtomicU64>,
    client_error_count: Arc<AtomicU64>,
    server_error_count: Arc<AtomicU64>,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// 4xx and 5xx responses together.
    pub fn errors(&self) -> u64 {
        self.client_error_count.load(Ordering::Relaxed) + self.server_error_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests(),
            client_errors: self.client_error_count.load(Ordering::Relaxed),
            server_errors: self.server_error_count.load(Ordering::Relaxed),
        }
    }

    fn record(&self, status: axum::http::StatusCode) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if status.is_client_error() {
            self.client_error_count.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            self.server_error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Middleware that counts every response by status class.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.record(response.status());
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::{Extension, Router};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn counts_requests_and_errors_by_class() {
        let metrics = ApiMetrics::new();
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/gone", get(|| async { StatusCode::NOT_FOUND }))
            .route("/boom", get(|| async { StatusCode::BAD_GATEWAY }))
            .layer(from_fn(metrics_middleware))
            .layer(Extension(metrics.clone()));

        for uri in ["/ok", "/gone", "/boom", "/ok"] {
            app.clone()
                .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                requests: 4,
                client_errors: 1,
                server_errors: 1,
            }
        );
        assert_eq!(metrics.errors(), 2);
    }
}
