//! # Dispatch Records
//!
//! The stored shapes of parcels, riders, tracking events, payments, and
//! users. Field names serialize in camelCase, the shape clients already
//! consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zap_core::{Email, ParcelId, RiderId, TrackingId, TransactionId};
use zap_state::{DeliveryStatus, PaymentStatus, RiderApproval, WorkStatus};

// ─── Parcel ──────────────────────────────────────────────────────────

/// A shipment and its lifecycle position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Parcel {
    #[schema(value_type = String, format = Uuid)]
    pub id: ParcelId,
    #[schema(value_type = String, example = "zap-20250309-0A1B2C")]
    pub tracking_id: TrackingId,
    #[schema(value_type = String, example = "pending-pickup")]
    pub delivery_status: DeliveryStatus,
    #[schema(value_type = String, example = "paid")]
    pub payment_status: PaymentStatus,
    #[schema(value_type = String)]
    pub sender_email: Email,
    pub sender_name: String,
    pub parcel_name: String,
    /// Whole currency units.
    pub cost: i64,
    /// Addresses, weights and other free-form details.
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    #[schema(value_type = Option<String>, format = Uuid)]
    pub rider_id: Option<RiderId>,
    pub rider_name: Option<String>,
    #[schema(value_type = Option<String>)]
    pub rider_email: Option<Email>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Parcel {
    /// What a compare-and-set against this parcel must still find.
    pub fn guard(&self) -> ParcelGuard {
        ParcelGuard {
            delivery_status: self.delivery_status,
            rider_id: self.rider_id,
        }
    }

    /// The parcel's current mutable fields, as a starting point for a change.
    pub fn change(&self) -> ParcelChange {
        ParcelChange {
            delivery_status: self.delivery_status,
            payment_status: self.payment_status,
            rider: self.rider_id.map(|id| AssignedRider {
                id,
                name: self.rider_name.clone().unwrap_or_default(),
                email: self.rider_email.clone(),
            }),
        }
    }

    /// Apply a change in place, stamping `updated_at`.
    pub fn apply(&mut self, change: &ParcelChange, at: DateTime<Utc>) {
        self.delivery_status = change.delivery_status;
        self.payment_status = change.payment_status;
        match &change.rider {
            Some(rider) => {
                self.rider_id = Some(rider.id);
                self.rider_name = Some(rider.name.clone());
                self.rider_email = rider.email.clone();
            }
            None => {
                self.rider_id = None;
                self.rider_name = None;
                self.rider_email = None;
            }
        }
        self.updated_at = at;
    }
}

/// Input for creating a parcel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelDraft {
    pub sender_email: Email,
    pub sender_name: String,
    pub parcel_name: String,
    pub cost: i64,
    pub details: serde_json::Value,
}

/// The observed state a conditional parcel write is predicated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParcelGuard {
    pub delivery_status: DeliveryStatus,
    pub rider_id: Option<RiderId>,
}

/// The full set of mutable parcel fields written by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelChange {
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    /// `None` clears all rider fields.
    pub rider: Option<AssignedRider>,
}

/// Rider fields copied onto a parcel at assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedRider {
    pub id: RiderId,
    pub name: String,
    pub email: Option<Email>,
}

// ─── Rider ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rider {
    #[schema(value_type = String, format = Uuid)]
    pub id: RiderId,
    pub name: String,
    #[schema(value_type = String)]
    pub email: Email,
    pub district: String,
    #[schema(value_type = String, example = "approved")]
    pub status: RiderApproval,
    #[schema(value_type = String, example = "available")]
    pub work_status: WorkStatus,
    pub created_at: DateTime<Utc>,
}

impl Rider {
    /// Approved and not carrying a parcel.
    pub fn can_take_assignment(&self) -> bool {
        self.status.is_approved() && self.work_status.is_available()
    }
}

// ─── Tracking Event ──────────────────────────────────────────────────

/// One immutable entry of a parcel's tracking log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    #[schema(value_type = String)]
    pub tracking_id: TrackingId,
    #[schema(value_type = String, example = "parcel-picked-up")]
    pub status: DeliveryStatus,
    /// `status` with separators replaced by spaces.
    pub details: String,
    pub created_at: DateTime<Utc>,
    /// Store-assigned, strictly increasing. Breaks timestamp ties.
    pub seq: i64,
}

// ─── Payment ─────────────────────────────────────────────────────────

/// A confirmed payment. At most one exists per transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[schema(value_type = String, example = "pi_3Abc")]
    pub transaction_id: TransactionId,
    #[schema(value_type = String)]
    pub tracking_id: TrackingId,
    #[schema(value_type = String, format = Uuid)]
    pub parcel_id: ParcelId,
    pub parcel_name: String,
    /// Amount charged, in minor units.
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    /// Status string as reported by the processor.
    pub payment_status: String,
    pub paid_at: DateTime<Utc>,
}

// ─── User ────────────────────────────────────────────────────────────

/// Authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Rider,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Rider => "rider",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "rider" => Ok(Self::Rider),
            "user" => Ok(Self::User),
            other => Err(format!("unknown role \"{other}\"")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(value_type = String)]
    pub email: Email,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
