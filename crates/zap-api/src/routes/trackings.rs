//! # Tracking API
//!
//! Routes:
//! - GET /v1/trackings/{trackingId}/logs: Public delivery history
//!
//! Mounted outside the auth middleware: a tracking id is the only
//! credential a recipient has.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use zap_core::TrackingId;
use zap_dispatch::TrackingEvent;

use crate::error::AppError;
use crate::extractors::parse_path;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/trackings/{tracking_id}/logs", get(tracking_logs))
}

/// GET /v1/trackings/{trackingId}/logs: Events oldest first. An unknown
/// tracking id yields an empty list.
#[utoipa::path(
    get,
    path = "/v1/trackings/{tracking_id}/logs",
    params(("tracking_id" = String, Path, description = "Tracking ID, e.g. zap-20250309-0A1B2C")),
    responses(
        (status = 200, description = "Tracking history", body = Vec<TrackingEvent>),
        (status = 422, description = "Malformed tracking id", body = crate::error::ErrorBody),
    ),
    tag = "trackings"
)]
pub async fn tracking_logs(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<TrackingEvent>>, AppError> {
    let tracking_id: TrackingId = parse_path(&tracking_id)?;
    Ok(Json(state.dispatch.ledger.history(&tracking_id).await?))
}
