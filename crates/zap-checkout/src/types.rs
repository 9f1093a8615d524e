//! Request and response shapes for hosted checkout sessions.
//!
//! Responses are decoded leniently: every field the dispatch layer does not
//! strictly need is optional, and unknown payment statuses decode to
//! [`SessionPaymentStatus::Unknown`] instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parameters for a one-line-item hosted checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSessionRequest {
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    /// ISO currency code, lowercase.
    pub currency: String,
    /// Line item product name shown on the hosted page.
    pub product_name: String,
    /// Opaque key/value pairs echoed back on retrieval.
    pub metadata: BTreeMap<String, String>,
    /// Pre-filled payer email.
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
}

impl CreateSessionRequest {
    /// Flatten into the processor's bracketed form encoding.
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                self.currency.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                self.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                self.product_name.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

/// A freshly created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted page URL. Absent only for sessions that already expired.
    #[serde(default)]
    pub url: Option<String>,
}

/// Payment status of a checkout session as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
    /// Forward-compatible catch-all.
    #[serde(other)]
    Unknown,
}

impl SessionPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::NoPaymentRequired => "no_payment_required",
            Self::Unknown => "unknown",
        }
    }
}

/// A retrieved checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    /// Transaction id; only present once the payer has submitted payment.
    #[serde(default)]
    pub payment_intent: Option<String>,
    pub payment_status: SessionPaymentStatus,
    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SessionStatus {
    /// Whether the processor considers this session paid.
    pub fn is_paid(&self) -> bool {
        self.payment_status == SessionPaymentStatus::Paid
    }

    /// Look up a metadata value set when the session was created.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateSessionRequest {
        CreateSessionRequest {
            amount_minor: 50_000,
            currency: "usd".into(),
            product_name: "Please Pay For : Books".into(),
            metadata: BTreeMap::from([
                ("parcelId".to_string(), "p-1".to_string()),
                ("trackingId".to_string(), "zap-20250101-ABCDEF".to_string()),
            ]),
            customer_email: Some("sender@example.com".into()),
            success_url: "http://site/ok".into(),
            cancel_url: "http://site/cancel".into(),
        }
    }

    #[test]
    fn form_flattens_line_item_and_metadata() {
        let form = request().to_form();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("50000"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("Please Pay For : Books")
        );
        assert_eq!(get("metadata[parcelId]"), Some("p-1"));
        assert_eq!(get("customer_email"), Some("sender@example.com"));
    }

    #[test]
    fn unknown_payment_status_decodes_to_catch_all() {
        let status: SessionStatus = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "payment_status": "processing_later",
        }))
        .unwrap();
        assert_eq!(status.payment_status, SessionPaymentStatus::Unknown);
        assert!(status.payment_intent.is_none());
        assert!(status.metadata.is_empty());
        assert!(!status.is_paid());
    }
}
