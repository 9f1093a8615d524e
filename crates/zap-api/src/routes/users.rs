//! # Users API
//!
//! Routes:
//! - POST  /v1/users: Register the calling principal
//! - GET   /v1/users/{email}/role: Role lookup
//! - PATCH /v1/users/{email}/role: Set a role (admin)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zap_core::Email;
use zap_dispatch::{Role, User};

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, parse_path, Validate};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub display_name: String,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("displayName must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    /// `admin`, `rider` or `user`.
    pub role: String,
}

impl Validate for SetRoleRequest {
    fn validate(&self) -> Result<(), String> {
        self.role.parse::<Role>().map(|_| ())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub email: String,
    pub role: Role,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(register_user))
        .route("/v1/users/{email}/role", get(get_role).patch(set_role))
}

/// POST /v1/users: Create the caller's user record if absent.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 200, description = "User already registered", body = User),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let req = extract_validated_json(body)?;
    let outcome = state
        .dispatch
        .users
        .register(caller.email, req.display_name.trim())
        .await?;
    let status = if outcome.is_inserted() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into_inner())))
}

/// GET /v1/users/{email}/role: Unknown users resolve to `user`.
#[utoipa::path(
    get,
    path = "/v1/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "Role resolved", body = RoleResponse),
        (status = 422, description = "Malformed email", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn get_role(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let email: Email = parse_path(&email)?;
    let role = state.dispatch.users.role_of(&email).await?;
    Ok(Json(RoleResponse {
        email: email.to_string(),
        role,
    }))
}

/// PATCH /v1/users/{email}/role: Set the role of an existing user.
#[utoipa::path(
    patch,
    path = "/v1/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 403, description = "Caller is not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub async fn set_role(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(email): Path<String>,
    body: Result<Json<SetRoleRequest>, JsonRejection>,
) -> Result<Json<User>, AppError> {
    require_role(&caller, Role::Admin)?;
    let email: Email = parse_path(&email)?;
    let req = extract_validated_json(body)?;
    let role: Role = req.role.parse().map_err(AppError::Validation)?;
    let user = state.dispatch.users.set_role(&email, role).await?;
    tracing::info!(email = %email, role = %role, by = %caller.email, "role updated");
    Ok(Json(user))
}
