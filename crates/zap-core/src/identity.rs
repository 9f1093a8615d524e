//! # Domain Identity Newtypes
//!
//! Storage identities for parcels and riders are UUIDs; processor-issued
//! identifiers (checkout sessions, transactions) are opaque strings owned by
//! the payment processor and only checked for emptiness.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Storage identity of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(Uuid);

impl ParcelId {
    /// Generate a new random parcel identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a parcel identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ParcelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParcelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParcelId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidUuid {
                kind: "parcel id",
                value: s.to_string(),
            })
    }
}

/// Storage identity of a rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiderId(Uuid);

impl RiderId {
    /// Generate a new random rider identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a rider identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RiderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RiderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RiderId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidUuid {
                kind: "rider id",
                value: s.to_string(),
            })
    }
}

/// Processor-assigned transaction identifier (the payment intent).
///
/// This is the idempotency key for payment recording: at most one payment
/// record exists per transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Wrap a processor transaction id. Rejects empty strings.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier {
                kind: "transaction id",
            });
        }
        Ok(Self(s))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processor-hosted checkout session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutSessionId(String);

impl CheckoutSessionId {
    /// Wrap a checkout session id. Rejects empty strings.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyIdentifier {
                kind: "checkout session id",
            });
        }
        Ok(Self(s))
    }

    /// Access the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckoutSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_id_parses_uuid_string() {
        let id = ParcelId::new();
        let parsed: ParcelId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rider_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<RiderId>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUuid { kind: "rider id", .. }));
    }

    #[test]
    fn parcel_id_serializes_as_plain_uuid() {
        let uuid = Uuid::new_v4();
        let json = serde_json::to_string(&ParcelId::from_uuid(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
    }

    #[test]
    fn transaction_id_rejects_blank() {
        assert!(TransactionId::new("   ").is_err());
        assert_eq!(TransactionId::new("pi_123").unwrap().as_str(), "pi_123");
    }

    #[test]
    fn checkout_session_id_rejects_empty() {
        assert!(CheckoutSessionId::new("").is_err());
        assert_eq!(
            CheckoutSessionId::new("cs_test_1").unwrap().to_string(),
            "cs_test_1"
        );
    }
}
