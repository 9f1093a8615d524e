//! # Riders API
//!
//! Routes:
//! - POST  /v1/riders: Apply as a rider
//! - PATCH /v1/riders/{id}/review: Approve or reject an application (admin)
//! - DELETE /v1/riders/{id}: Remove a rider who is not on a delivery (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use zap_core::RiderId;
use zap_dispatch::{Rider, RiderApplication, Role};
use zap_state::RiderApproval;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_path, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RiderApplicationRequest {
    pub name: String,
    pub district: String,
}

impl Validate for RiderApplicationRequest {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.district.trim().is_empty() {
            return Err("district must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRiderRequest {
    /// `approved` or `rejected`.
    pub decision: String,
}

impl Validate for ReviewRiderRequest {
    fn validate(&self) -> Result<(), String> {
        match self.decision.parse::<RiderApproval>()? {
            RiderApproval::Pending => Err("decision must be approved or rejected".into()),
            _ => Ok(()),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/riders", post(apply))
        .route("/v1/riders/{id}", delete(remove))
        .route("/v1/riders/{id}/review", patch(review))
}

/// POST /v1/riders: The caller's email identifies the applicant.
#[utoipa::path(
    post,
    path = "/v1/riders",
    request_body = RiderApplicationRequest,
    responses(
        (status = 201, description = "Application filed", body = Rider),
        (status = 409, description = "Caller already applied", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "riders"
)]
pub async fn apply(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RiderApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Rider>), AppError> {
    let req = extract_validated_json(body)?;
    let rider = state
        .dispatch
        .onboarding
        .apply(RiderApplication {
            name: req.name,
            email: caller.email,
            district: req.district,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(rider)))
}

/// PATCH /v1/riders/{id}/review: Approval grants the rider role.
#[utoipa::path(
    patch,
    path = "/v1/riders/{id}/review",
    params(("id" = String, Path, description = "Rider ID")),
    request_body = ReviewRiderRequest,
    responses(
        (status = 200, description = "Application reviewed", body = Rider),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Rider not found", body = crate::error::ErrorBody),
    ),
    tag = "riders"
)]
pub async fn review(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<ReviewRiderRequest>, JsonRejection>,
) -> Result<Json<Rider>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id: RiderId = parse_path(&id)?;
    let req = extract_validated_json(body)?;
    let decision: RiderApproval = req.decision.parse().map_err(AppError::Validation)?;
    let rider = state.dispatch.onboarding.review(id, decision).await?;
    Ok(Json(rider))
}

#[utoipa::path(
    delete,
    path = "/v1/riders/{id}",
    params(("id" = String, Path, description = "Rider ID")),
    responses(
        (status = 200, description = "Rider removed", body = Rider),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Rider not found", body = crate::error::ErrorBody),
        (status = 409, description = "Rider is on a delivery", body = crate::error::ErrorBody),
    ),
    tag = "riders"
)]
pub async fn remove(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Rider>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id: RiderId = parse_path(&id)?;
    Ok(Json(state.dispatch.onboarding.remove(id).await?))
}
