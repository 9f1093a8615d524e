//! # Payment Status
//!
//! A parcel is either unpaid or paid. There is no refund path.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Payment status of a parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No confirmed payment yet.
    #[default]
    Unpaid,
    /// Payment confirmed by the processor.
    Paid,
}

impl PaymentStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            other => Err(format!("unknown payment status \"{other}\"")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unpaid() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Unpaid);
        assert!(!PaymentStatus::Unpaid.is_paid());
    }

    #[test]
    fn test_parse_and_serialize() {
        assert_eq!("paid".parse(), Ok(PaymentStatus::Paid));
        assert!("PAID".parse::<PaymentStatus>().is_err());
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"paid\"");
    }
}
