//! # Parcels API
//!
//! Routes:
//! - POST  /v1/parcels: Create a parcel for the caller
//! - GET   /v1/parcels/{id}: Parcel details
//! - DELETE /v1/parcels/{id}: Cancel an unpaid parcel (sender or admin)
//! - PATCH /v1/parcels/{id}/assign: Assign a rider (admin)
//! - PATCH /v1/parcels/{id}/status: Report progress (assigned rider)
//! - PATCH /v1/parcels/{id}/reject: Hand the parcel back (assigned rider)
//!
//! Every write returns the updated parcel together with the outcome of the
//! tracking ledger write.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use zap_core::{ParcelId, RiderId};
use zap_dispatch::{Parcel, ParcelDraft, Role, TransitionOutcome};
use zap_state::DeliveryStatus;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, parse_path, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateParcelRequest {
    pub sender_name: String,
    pub parcel_name: String,
    /// Whole currency units.
    pub cost: i64,
    /// Addresses, weights and other free-form details.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

impl Validate for CreateParcelRequest {
    fn validate(&self) -> Result<(), String> {
        if self.sender_name.trim().is_empty() {
            return Err("senderName must not be empty".into());
        }
        if self.parcel_name.trim().is_empty() {
            return Err("parcelName must not be empty".into());
        }
        if self.cost <= 0 {
            return Err("cost must be positive".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRiderRequest {
    #[schema(format = Uuid)]
    pub rider_id: String,
}

impl Validate for AssignRiderRequest {
    fn validate(&self) -> Result<(), String> {
        self.rider_id
            .parse::<RiderId>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "rider-arriving")]
    pub status: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/parcels", post(create_parcel))
        .route("/v1/parcels/{id}", get(get_parcel).delete(cancel_parcel))
        .route("/v1/parcels/{id}/assign", patch(assign_rider))
        .route("/v1/parcels/{id}/status", patch(update_status))
        .route("/v1/parcels/{id}/reject", patch(reject_parcel))
}

/// POST /v1/parcels: The caller becomes the sender.
#[utoipa::path(
    post,
    path = "/v1/parcels",
    request_body = CreateParcelRequest,
    responses(
        (status = 201, description = "Parcel created", body = TransitionOutcome),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn create_parcel(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateParcelRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TransitionOutcome>), AppError> {
    let req = extract_validated_json(body)?;
    let draft = ParcelDraft {
        sender_email: caller.email,
        sender_name: req.sender_name.trim().to_string(),
        parcel_name: req.parcel_name.trim().to_string(),
        cost: req.cost,
        details: req.details,
    };
    let outcome = state.dispatch.lifecycle.create(draft).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[utoipa::path(
    get,
    path = "/v1/parcels/{id}",
    params(("id" = String, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel found", body = Parcel),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn get_parcel(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id: ParcelId = parse_path(&id)?;
    Ok(Json(state.dispatch.lifecycle.get(id).await?))
}

/// DELETE /v1/parcels/{id}: Withdraw a parcel before it is paid.
#[utoipa::path(
    delete,
    path = "/v1/parcels/{id}",
    params(("id" = String, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel cancelled", body = Parcel),
        (status = 403, description = "Caller is neither the sender nor an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
        (status = 409, description = "Parcel already paid", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn cancel_parcel(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id: ParcelId = parse_path(&id)?;
    let parcel = state.dispatch.lifecycle.get(id).await?;
    if parcel.sender_email != caller.email && !caller.is_admin() {
        return Err(AppError::Forbidden(format!(
            "only the sender may cancel parcel {id}"
        )));
    }
    Ok(Json(state.dispatch.lifecycle.cancel(id).await?))
}

/// PATCH /v1/parcels/{id}/assign: Put a rider on a paid parcel.
#[utoipa::path(
    patch,
    path = "/v1/parcels/{id}/assign",
    params(("id" = String, Path, description = "Parcel ID")),
    request_body = AssignRiderRequest,
    responses(
        (status = 200, description = "Rider assigned", body = TransitionOutcome),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Parcel or rider not found", body = crate::error::ErrorBody),
        (status = 409, description = "Rider unavailable or invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn assign_rider(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<AssignRiderRequest>, JsonRejection>,
) -> Result<Json<TransitionOutcome>, AppError> {
    require_role(&caller, Role::Admin)?;
    let id: ParcelId = parse_path(&id)?;
    let req = extract_validated_json(body)?;
    let rider_id: RiderId = parse_path(&req.rider_id)?;
    let outcome = state.dispatch.lifecycle.assign_rider(id, rider_id).await?;
    Ok(Json(outcome))
}

/// PATCH /v1/parcels/{id}/status: The assigned rider reports progress.
#[utoipa::path(
    patch,
    path = "/v1/parcels/{id}/status",
    params(("id" = String, Path, description = "Parcel ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status advanced", body = TransitionOutcome),
        (status = 403, description = "Caller is not the assigned rider", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown status", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn update_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let id: ParcelId = parse_path(&id)?;
    let rider_id = acting_rider(&state, &caller).await?;
    let req = extract_json(body)?;
    let status: DeliveryStatus = req.status.trim().parse()?;
    let outcome = state
        .dispatch
        .lifecycle
        .advance_status(id, rider_id, status)
        .await?;
    Ok(Json(outcome))
}

/// PATCH /v1/parcels/{id}/reject: The assigned rider declines the parcel.
#[utoipa::path(
    patch,
    path = "/v1/parcels/{id}/reject",
    params(("id" = String, Path, description = "Parcel ID")),
    responses(
        (status = 200, description = "Parcel returned to the pickup pool", body = TransitionOutcome),
        (status = 403, description = "Caller is not the assigned rider", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "parcels"
)]
pub async fn reject_parcel(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<TransitionOutcome>, AppError> {
    let id: ParcelId = parse_path(&id)?;
    let rider_id = acting_rider(&state, &caller).await?;
    let outcome = state.dispatch.lifecycle.reject(id, rider_id).await?;
    Ok(Json(outcome))
}

/// The rider record behind a caller acting in the rider role.
async fn acting_rider(state: &AppState, caller: &CallerIdentity) -> Result<RiderId, AppError> {
    require_role(caller, Role::Rider)?;
    state
        .dispatch
        .riders
        .find_by_email(&caller.email)
        .await?
        .map(|rider| rider.id)
        .ok_or_else(|| AppError::Forbidden(format!("{} is not a registered rider", caller.email)))
}
