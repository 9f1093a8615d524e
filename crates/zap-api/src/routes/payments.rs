//! # Payments API
//!
//! Routes:
//! - POST  /v1/payments/checkout-session: Open a hosted checkout for a parcel
//! - PATCH /v1/payments/confirm?session_id=: Reconcile a completed checkout
//!
//! Both return 503 when no payment processor is configured.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use zap_core::{CheckoutSessionId, ParcelId};
use zap_dispatch::{CheckoutLink, Confirmation};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, parse_path, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    #[schema(format = Uuid)]
    pub parcel_id: String,
}

impl Validate for CheckoutSessionRequest {
    fn validate(&self) -> Result<(), String> {
        self.parcel_id
            .parse::<ParcelId>()
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConfirmQuery {
    /// Checkout session id from the processor redirect.
    pub session_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/checkout-session", post(create_checkout_session))
        .route("/v1/payments/confirm", patch(confirm_payment))
}

/// POST /v1/payments/checkout-session: Hosted checkout for an unpaid parcel.
#[utoipa::path(
    post,
    path = "/v1/payments/checkout-session",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout opened", body = CheckoutLink),
        (status = 404, description = "Parcel not found", body = crate::error::ErrorBody),
        (status = 409, description = "Parcel already paid", body = crate::error::ErrorBody),
        (status = 502, description = "Processor failure", body = crate::error::ErrorBody),
        (status = 503, description = "Checkout not configured", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    body: Result<Json<CheckoutSessionRequest>, JsonRejection>,
) -> Result<Json<CheckoutLink>, AppError> {
    let req = extract_validated_json(body)?;
    let parcel_id: ParcelId = parse_path(&req.parcel_id)?;
    let link = state.dispatch.reconciler.open_checkout(parcel_id).await?;
    Ok(Json(link))
}

/// PATCH /v1/payments/confirm: Idempotent; repeated calls report
/// `alreadyProcessed`.
#[utoipa::path(
    patch,
    path = "/v1/payments/confirm",
    params(ConfirmQuery),
    responses(
        (status = 200, description = "Confirmation outcome", body = Confirmation),
        (status = 400, description = "Missing session_id", body = crate::error::ErrorBody),
        (status = 502, description = "Processor failure", body = crate::error::ErrorBody),
        (status = 503, description = "Checkout not configured", body = crate::error::ErrorBody),
    ),
    tag = "payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    query: Result<Query<ConfirmQuery>, QueryRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let query = extract_query(query)?;
    let session_id = CheckoutSessionId::new(query.session_id)?;
    let confirmation = state.dispatch.reconciler.confirm(&session_id).await?;
    Ok(Json(confirmation))
}
