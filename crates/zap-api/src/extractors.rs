//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs, helpers that turn JSON and query
//! rejections into [`AppError::BadRequest`], and path-segment parsing into
//! domain identifiers.

use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Business-rule checks beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Parse a path segment into a domain identifier. Failures are 422.
pub fn parse_path<T>(raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| AppError::Validation(e.to_string()))
}
