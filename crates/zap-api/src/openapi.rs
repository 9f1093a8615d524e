//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI 3.1 spec,
//! served unauthenticated at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Zap Dispatch API",
        version = "0.1.0",
        description = "Parcel creation, hosted checkout, rider dispatch and public tracking.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Users
        crate::routes::users::register_user,
        crate::routes::users::get_role,
        crate::routes::users::set_role,
        // Parcels
        crate::routes::parcels::create_parcel,
        crate::routes::parcels::get_parcel,
        crate::routes::parcels::cancel_parcel,
        crate::routes::parcels::assign_rider,
        crate::routes::parcels::update_status,
        crate::routes::parcels::reject_parcel,
        // Payments
        crate::routes::payments::create_checkout_session,
        crate::routes::payments::confirm_payment,
        // Trackings
        crate::routes::trackings::tracking_logs,
        // Riders
        crate::routes::riders::apply,
        crate::routes::riders::review,
        crate::routes::riders::remove,
    ),
    components(schemas(
        // Records
        zap_dispatch::Parcel,
        zap_dispatch::Rider,
        zap_dispatch::TrackingEvent,
        zap_dispatch::Payment,
        zap_dispatch::User,
        zap_dispatch::Role,
        zap_dispatch::TransitionOutcome,
        zap_dispatch::LedgerWrite,
        zap_dispatch::CheckoutLink,
        zap_dispatch::Confirmation,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Metrics
        crate::middleware::metrics::MetricsSnapshot,
        // Request DTOs
        crate::routes::users::RegisterUserRequest,
        crate::routes::users::SetRoleRequest,
        crate::routes::users::RoleResponse,
        crate::routes::parcels::CreateParcelRequest,
        crate::routes::parcels::AssignRiderRequest,
        crate::routes::parcels::UpdateStatusRequest,
        crate::routes::payments::CheckoutSessionRequest,
        crate::routes::riders::RiderApplicationRequest,
        crate::routes::riders::ReviewRiderRequest,
    )),
    tags(
        (name = "users", description = "User registration and roles"),
        (name = "parcels", description = "Parcel lifecycle"),
        (name = "payments", description = "Hosted checkout and payment reconciliation"),
        (name = "trackings", description = "Public tracking history"),
        (name = "riders", description = "Rider onboarding"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
