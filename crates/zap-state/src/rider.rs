//! # Rider Status
//!
//! Two independent axes:
//!
//! - [`RiderApproval`]: the onboarding decision (`pending → approved | rejected`).
//! - [`WorkStatus`]: whether the rider can take a new parcel right now.
//!
//! Only approved riders can be assigned. `WorkStatus` is the single source of
//! truth for availability; it is never derived from the parcels a rider holds.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─── Approval ────────────────────────────────────────────────────────

/// Outcome of a rider application review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiderApproval {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RiderApproval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl std::fmt::Display for RiderApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiderApproval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown rider approval \"{other}\"")),
        }
    }
}

// ─── Work Status ─────────────────────────────────────────────────────

/// Rider availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Free to receive an assignment.
    #[default]
    Available,
    /// Carrying a parcel.
    InDelivery,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InDelivery => "in_delivery",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "in_delivery" => Ok(Self::InDelivery),
            other => Err(format!("unknown work status \"{other}\"")),
        }
    }
}
