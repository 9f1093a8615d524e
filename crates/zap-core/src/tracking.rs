//! # Tracking Identifiers
//!
//! A tracking id is the human-shareable handle of a shipment, distinct from
//! the parcel's storage identity. Format:
//!
//! ```text
//! zap-<YYYYMMDD>-<6 uppercase hex chars>
//! ```
//!
//! The date is the UTC creation date. The suffix is three random bytes, so
//! collisions are improbable but not impossible; the storage layer carries a
//! uniqueness constraint as the backstop.

use chrono::{DateTime, NaiveDate, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const PREFIX: &str = "zap";
const SUFFIX_LEN: usize = 6;

/// Human-shareable shipment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackingId(String);

impl TrackingId {
    /// Mint a fresh tracking id for a parcel created now.
    pub fn mint() -> Self {
        Self::mint_at(Utc::now(), &mut rand::thread_rng())
    }

    /// Mint a tracking id for the given instant using the supplied RNG.
    pub fn mint_at(at: DateTime<Utc>, rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; SUFFIX_LEN / 2];
        rng.fill_bytes(&mut bytes);
        let suffix: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        Self(format!("{PREFIX}-{}-{suffix}", at.format("%Y%m%d")))
    }

    /// Validate an externally supplied tracking id.
    ///
    /// Hex digits are accepted in either case and normalized to uppercase.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTrackingId(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let (prefix, date, suffix) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(d), Some(x)) => (p, d, x),
            _ => return Err(invalid()),
        };
        if !prefix.eq_ignore_ascii_case(PREFIX) {
            return Err(invalid());
        }
        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(invalid());
        }
        if suffix.len() != SUFFIX_LEN || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        Ok(Self(format!(
            "{PREFIX}-{date}-{}",
            suffix.to_ascii_uppercase()
        )))
    }

    /// Access the tracking id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TrackingId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TrackingId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackingId> for String {
    fn from(id: TrackingId) -> Self {
        id.0
    }
}
