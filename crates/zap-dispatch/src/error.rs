//! # Dispatch Errors
//!
//! [`StoreError`] is what repositories raise. [`DispatchError`] is what the
//! domain components raise; the API layer maps it onto HTTP statuses.

use thiserror::Error;
use zap_core::{ParcelId, RiderId, ValidationError};
use zap_state::TransitionError;

/// Failure inside a repository backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete the call (connection, query, I/O).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A uniqueness constraint rejected the write.
    #[error("duplicate {kind}: {key}")]
    Duplicate {
        /// Which constraint.
        kind: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// A stored row could not be decoded into a domain record.
    #[error("corrupt {kind} record {id}: {detail}")]
    Corrupt {
        kind: &'static str,
        id: String,
        detail: String,
    },
}

/// Errors raised by the dispatch components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A concurrent writer got there first, or the request collides with
    /// existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("validation failed: {0}")]
    Validation(String),

    /// The rider cannot take the assignment (busy, or not approved).
    #[error("rider {rider_id} is unavailable: {reason}")]
    RiderUnavailable {
        rider_id: RiderId,
        reason: &'static str,
    },

    /// The caller acts as a rider who is not assigned to the parcel.
    #[error("rider {rider_id} is not assigned to parcel {parcel_id}")]
    NotAssignedRider {
        parcel_id: ParcelId,
        rider_id: RiderId,
    },

    /// Store or payment processor failure.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// No payment processor is configured.
    #[error("checkout is not configured")]
    CheckoutDisabled,
}

impl DispatchError {
    pub(crate) fn parcel_not_found(id: ParcelId) -> Self {
        Self::NotFound {
            kind: "parcel",
            id: id.to_string(),
        }
    }

    pub(crate) fn rider_not_found(id: RiderId) -> Self {
        Self::NotFound {
            kind: "rider",
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { kind, key } => {
                Self::Conflict(format!("{kind} {key} already exists"))
            }
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<ValidationError> for DispatchError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<zap_checkout::CheckoutError> for DispatchError {
    fn from(err: zap_checkout::CheckoutError) -> Self {
        Self::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_store_error_becomes_conflict() {
        let err: DispatchError = StoreError::Duplicate {
            kind: "payment",
            key: "pi_1".into(),
        }
        .into();
        assert_eq!(err, DispatchError::Conflict("payment pi_1 already exists".into()));
    }

    #[test]
    fn backend_store_error_becomes_upstream() {
        let err: DispatchError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(err, DispatchError::Upstream(msg) if msg.contains("connection reset")));
    }
}
