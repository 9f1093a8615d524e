//! # Authentication & Authorization
//!
//! Bearer credentials are HS256 JWTs carrying the caller's `email` claim.
//! The middleware verifies the token, resolves the caller's [`Role`] through
//! the user directory, and injects a [`CallerIdentity`] into the request
//! extensions. Handlers extract it via the `FromRequestParts` impl.
//!
//! With no `ZAP_JWT_SECRET` configured every request runs as the development
//! admin [`DEV_ADMIN_EMAIL`].

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use zap_core::Email;
use zap_dispatch::Role;

use crate::error::AppError;
use crate::state::AppState;

/// Principal used for every request when authentication is disabled.
pub const DEV_ADMIN_EMAIL: &str = "dev@zap.local";

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Expiration (Unix timestamp seconds).
    pub exp: i64,
    /// Issued at (Unix timestamp seconds).
    pub iat: i64,
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub email: Email,
    pub role: Role,
}

impl CallerIdentity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller holds `required`. Admins pass every check.
pub fn require_role(caller: &CallerIdentity, required: Role) -> Result<(), AppError> {
    if caller.role == required || caller.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{required}' required, caller has '{}'",
            caller.role
        )))
    }
}

// ── Tokens ──────────────────────────────────────────────────────────────────

/// Issue a token for `email`, valid for `ttl`.
pub fn issue_token(
    email: &Email,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        email: email.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and return the email it was issued for.
pub fn verify_token(token: &str, secret: &str) -> Result<Email, AppError> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "token verification failed");
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    Email::new(&data.claims.email)
        .map_err(|_| AppError::Unauthorized("token email claim is not a valid address".into()))
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Authenticate the request and inject its [`CallerIdentity`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match authenticate(&state, request.headers()).await {
        Ok(identity) => identity,
        Err(err) => {
            if matches!(err, AppError::Unauthorized(_)) {
                tracing::warn!(error = %err, path = %request.uri().path(), "authentication failed");
            }
            return err.into_response();
        }
    };
    request.extensions_mut().insert(identity);
    next.run(request).await
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        let email = Email::new(DEV_ADMIN_EMAIL)?;
        return Ok(CallerIdentity {
            email,
            role: Role::Admin,
        });
    };

    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;
    let email = verify_token(bearer.token(), secret)?;
    let role = state.dispatch.users.role_of(&email).await?;
    Ok(CallerIdentity { email, role })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::new(s).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let token = issue_token(&email("rina@example.com"), "s3cret", chrono::Duration::hours(1)).unwrap();
        assert_eq!(verify_token(&token, "s3cret").unwrap(), email("rina@example.com"));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_token(&email("rina@example.com"), "s3cret", chrono::Duration::hours(1)).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = issue_token(&email("rina@example.com"), "s3cret", chrono::Duration::hours(-2)).unwrap();
        assert!(matches!(verify_token(&token, "s3cret"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(verify_token("not.a.jwt", "s3cret"), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn admin_satisfies_every_role() {
        let admin = CallerIdentity {
            email: email("ops@example.com"),
            role: Role::Admin,
        };
        assert!(require_role(&admin, Role::Rider).is_ok());
        assert!(require_role(&admin, Role::Admin).is_ok());
    }

    #[test]
    fn plain_user_is_forbidden_from_rider_actions() {
        let user = CallerIdentity {
            email: email("sam@example.com"),
            role: Role::User,
        };
        assert!(matches!(require_role(&user, Role::Rider), Err(AppError::Forbidden(_))));
        assert!(matches!(require_role(&user, Role::Admin), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn dev_admin_email_is_valid() {
        assert!(Email::new(DEV_ADMIN_EMAIL).is_ok());
    }
}
