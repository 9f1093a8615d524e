//! # Rider Assignment Policy
//!
//! Controls how permissive rider assignment is.
//!
//! | Policy | Rider must be available | Reassign from |
//! |---|---|---|
//! | `Strict` | yes (conditional reservation) | `driver-assigned` |
//! | `Override` | no (unconditional busy flag) | `driver-assigned`, `rider-arriving` |
//!
//! `Override` lets an operator push any rider onto any parcel that has not
//! been picked up yet.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How rider assignment treats busy riders and already-assigned parcels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Only available riders; reassignment only before the rider sets off.
    #[default]
    Strict,
    /// Dispatcher override: no availability check, wider reassignment window.
    Override,
}

impl AssignmentPolicy {
    /// Return the string representation of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Override => "override",
        }
    }

    /// Whether the target rider must currently be available.
    pub fn requires_available_rider(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl std::fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "override" => Ok(Self::Override),
            other => Err(format!(
                "unknown assignment policy \"{other}\" (expected strict or override)"
            )),
        }
    }
}
