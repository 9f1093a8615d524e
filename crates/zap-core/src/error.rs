//! # Validation Errors
//!
//! Errors raised when a primitive fails its constructor checks. Each variant
//! carries the rejected input so the API layer can echo it back.

use thiserror::Error;

/// A primitive value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Tracking id does not match `zap-<YYYYMMDD>-<6 hex>`.
    #[error("invalid tracking id: \"{0}\" (expected zap-YYYYMMDD-XXXXXX)")]
    InvalidTrackingId(String),

    /// Email address is empty or lacks a local part / domain.
    #[error("invalid email address: \"{0}\"")]
    InvalidEmail(String),

    /// An opaque identifier was empty.
    #[error("{kind} must not be empty")]
    EmptyIdentifier {
        /// Which identifier was empty.
        kind: &'static str,
    },

    /// A UUID-backed identifier could not be parsed.
    #[error("invalid {kind}: \"{value}\"")]
    InvalidUuid {
        /// Which identifier failed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}
