//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`DispatchError`] and boundary validation failures to HTTP status
//! codes with a JSON body of the form `{"error": {"code", "message"}}`.
//! Internal and upstream details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use zap_dispatch::DispatchError;
use zap_state::TransitionError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "CONFLICT").
    pub code: String,
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Well-formed request with semantically invalid content (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Store or payment processor failure (502). Message is logged only.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A dependency is not configured (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Message is logged only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Upstream(_) => "An upstream service error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::Upstream(_) => tracing::error!(error = %self, "upstream failure"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NotFound { .. } => Self::NotFound(err.to_string()),
            DispatchError::Conflict(_) | DispatchError::RiderUnavailable { .. } => {
                Self::Conflict(err.to_string())
            }
            DispatchError::InvalidTransition(TransitionError::UnknownStatus(_))
            | DispatchError::Validation(_) => Self::Validation(err.to_string()),
            DispatchError::InvalidTransition(_) => Self::Conflict(err.to_string()),
            DispatchError::NotAssignedRider { .. } => Self::Forbidden(err.to_string()),
            DispatchError::Upstream(_) => Self::Upstream(err.to_string()),
            DispatchError::CheckoutDisabled => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<zap_core::ValidationError> for AppError {
    fn from(err: zap_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        DispatchError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use zap_core::{ParcelId, RiderId};
    use zap_state::{DeliveryStatus, LifecycleAction};

    use super::*;

    fn status_of(err: DispatchError) -> StatusCode {
        AppError::from(err).status_and_code().0
    }

    #[test]
    fn dispatch_errors_map_to_statuses() {
        assert_eq!(
            status_of(DispatchError::NotFound {
                kind: "parcel",
                id: "x".into()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(DispatchError::Conflict("stale".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DispatchError::RiderUnavailable {
                rider_id: RiderId::new(),
                reason: "already on a delivery"
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DispatchError::InvalidTransition(TransitionError::InvalidTransition {
                from: DeliveryStatus::ParcelCreated,
                action: LifecycleAction::Assign,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DispatchError::InvalidTransition(TransitionError::UnknownStatus(
                "lost".into()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DispatchError::Validation("cost".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DispatchError::NotAssignedRider {
                parcel_id: ParcelId::new(),
                rider_id: RiderId::new()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(DispatchError::Upstream("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_of(DispatchError::CheckoutDisabled),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn bad_request_is_400() {
        let (status, code) = AppError::BadRequest("malformed JSON".into()).status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[tokio::test]
    async fn upstream_details_are_not_returned() {
        let response = AppError::Upstream("db password rejected for zap@10.0.0.4".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "UPSTREAM_ERROR");
        assert!(!body.error.message.contains("10.0.0.4"));
    }

    #[tokio::test]
    async fn client_errors_carry_their_message() {
        let response = AppError::Forbidden("role 'admin' required".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "FORBIDDEN");
        assert!(body.error.message.contains("role 'admin' required"));
    }
}
