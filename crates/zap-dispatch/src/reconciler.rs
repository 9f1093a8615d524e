//! # Payment Reconciler
//!
//! Turns a completed hosted checkout into exactly one payment record and the
//! parcel's first lifecycle transition.
//!
//! ## Confirmation
//!
//! 1. Retrieve the session from the processor. Failure aborts with
//!    `Upstream` before anything is written.
//! 2. If a payment for the session's transaction id exists, report
//!    `alreadyProcessed` without writing.
//! 3. If the session is not paid, or carries no transaction id yet, report
//!    `notPaid` without writing.
//! 4. Mark the parcel paid, then insert the payment through the unique
//!    transaction id constraint. Losing that insert to a concurrent
//!    confirmer is reported as `alreadyProcessed`.
//! 5. Record `pending-pickup` in the ledger and report `confirmed`.
//!
//! The existence check in step 2 is only a shortcut; the uniqueness
//! constraint in step 4 is what guarantees one payment per transaction.
//! A crash between marking the parcel paid and inserting the payment is
//! healed by confirming again, since marking paid is idempotent.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use zap_checkout::CreateSessionRequest;
use zap_core::{CheckoutSessionId, ParcelId, TrackingId, TransactionId};
use zap_state::DeliveryStatus;

use crate::error::DispatchError;
use crate::ledger::TrackingLedger;
use crate::lifecycle::ParcelLifecycle;
use crate::processor::PaymentProcessor;
use crate::records::Payment;
use crate::repository::{InsertOutcome, PaymentRepository};

/// Metadata keys set on a checkout session and read back on confirmation.
pub mod metadata {
    pub const PARCEL_ID: &str = "parcelId";
    pub const PARCEL_NAME: &str = "parcelName";
    pub const TRACKING_ID: &str = "trackingId";
}

/// Checkout presentation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Base URL of the web client the processor redirects back to.
    pub site_domain: String,
    pub currency: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            site_domain: "http://localhost:5173".to_string(),
            currency: "usd".to_string(),
        }
    }
}

impl CheckoutSettings {
    fn site(&self) -> &str {
        self.site_domain.trim_end_matches('/')
    }

    pub fn success_url(&self) -> String {
        format!(
            "{}/dashboard/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site()
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/dashboard/payment-cancelled", self.site())
    }
}

/// Result of confirming a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Confirmation {
    /// A payment for this transaction was recorded earlier.
    AlreadyProcessed {
        #[serde(rename = "transactionId")]
        #[schema(value_type = String)]
        transaction_id: TransactionId,
        #[serde(rename = "trackingId")]
        #[schema(value_type = String)]
        tracking_id: TrackingId,
    },
    /// This call recorded the payment.
    Confirmed {
        #[serde(rename = "parcelId")]
        #[schema(value_type = String, format = Uuid)]
        parcel_id: ParcelId,
        #[serde(rename = "trackingId")]
        #[schema(value_type = String)]
        tracking_id: TrackingId,
        #[serde(rename = "transactionId")]
        #[schema(value_type = String)]
        transaction_id: TransactionId,
    },
    /// The processor does not report the session as paid.
    NotPaid {
        #[serde(rename = "sessionId")]
        #[schema(value_type = String)]
        session_id: CheckoutSessionId,
    },
}

/// A hosted checkout page opened for a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLink {
    pub session_id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct PaymentReconciler {
    processor: Option<Arc<dyn PaymentProcessor>>,
    payments: Arc<dyn PaymentRepository>,
    lifecycle: ParcelLifecycle,
    ledger: TrackingLedger,
    settings: CheckoutSettings,
}

impl PaymentReconciler {
    pub fn new(
        processor: Option<Arc<dyn PaymentProcessor>>,
        payments: Arc<dyn PaymentRepository>,
        lifecycle: ParcelLifecycle,
        ledger: TrackingLedger,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            processor,
            payments,
            lifecycle,
            ledger,
            settings,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.processor.is_some()
    }

    fn processor(&self) -> Result<&Arc<dyn PaymentProcessor>, DispatchError> {
        self.processor.as_ref().ok_or(DispatchError::CheckoutDisabled)
    }

    /// Open a hosted checkout page for an unpaid parcel.
    pub async fn open_checkout(&self, parcel_id: ParcelId) -> Result<CheckoutLink, DispatchError> {
        let processor = self.processor()?;
        let parcel = self.lifecycle.get(parcel_id).await?;
        if parcel.payment_status.is_paid() {
            return Err(DispatchError::Conflict(format!(
                "parcel {parcel_id} is already paid"
            )));
        }
        let amount_minor = parcel.cost.checked_mul(100).ok_or_else(|| {
            DispatchError::Validation(format!("cost {} is out of range", parcel.cost))
        })?;

        let request = CreateSessionRequest {
            amount_minor,
            currency: self.settings.currency.clone(),
            product_name: format!("Please Pay For : {}", parcel.parcel_name),
            metadata: [
                (metadata::PARCEL_ID, parcel.id.to_string()),
                (metadata::PARCEL_NAME, parcel.parcel_name.clone()),
                (metadata::TRACKING_ID, parcel.tracking_id.to_string()),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            customer_email: Some(parcel.sender_email.to_string()),
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
        };

        let session = processor.create_checkout_session(&request).await?;
        let url = session.url.ok_or_else(|| {
            DispatchError::Upstream(format!("checkout session {} has no payment page", session.id))
        })?;
        tracing::info!(parcel_id = %parcel_id, session_id = %session.id, amount_minor, "checkout opened");
        Ok(CheckoutLink {
            session_id: session.id,
            url,
        })
    }

    /// Confirm a checkout session. Safe to call any number of times,
    /// concurrently, for the same session.
    pub async fn confirm(&self, session_id: &CheckoutSessionId) -> Result<Confirmation, DispatchError> {
        let processor = self.processor()?;
        let session = processor.retrieve_session(session_id).await.map_err(|e| {
            tracing::warn!(session_id = %session_id, error = %e, "checkout session retrieval failed");
            DispatchError::from(e)
        })?;

        let transaction_id = session
            .payment_intent
            .as_deref()
            .and_then(|pi| TransactionId::new(pi).ok());

        if let Some(tx) = &transaction_id {
            if let Some(existing) = self.payments.find_by_transaction(tx).await? {
                return Ok(Confirmation::AlreadyProcessed {
                    transaction_id: tx.clone(),
                    tracking_id: existing.tracking_id,
                });
            }
        }

        let transaction_id = match transaction_id {
            Some(tx) if session.is_paid() => tx,
            _ => {
                tracing::info!(
                    session_id = %session_id,
                    payment_status = session.payment_status.as_str(),
                    "checkout session not paid"
                );
                return Ok(Confirmation::NotPaid {
                    session_id: session_id.clone(),
                });
            }
        };

        let parcel_id: ParcelId = session
            .metadata_value(metadata::PARCEL_ID)
            .ok_or_else(|| {
                DispatchError::Upstream(format!("checkout session {session_id} carries no parcel id"))
            })?
            .parse()
            .map_err(|e| DispatchError::Upstream(format!("checkout session {session_id}: {e}")))?;

        let parcel = self.lifecycle.mark_paid(parcel_id).await?.parcel;
        if let Some(meta) = session.metadata_value(metadata::TRACKING_ID) {
            if meta != parcel.tracking_id.as_str() {
                tracing::warn!(
                    parcel_id = %parcel_id,
                    session_tracking_id = meta,
                    tracking_id = %parcel.tracking_id,
                    "checkout metadata tracking id differs from parcel"
                );
            }
        }

        let payment = Payment {
            transaction_id: transaction_id.clone(),
            tracking_id: parcel.tracking_id.clone(),
            parcel_id,
            parcel_name: session
                .metadata_value(metadata::PARCEL_NAME)
                .map(str::to_string)
                .unwrap_or_else(|| parcel.parcel_name.clone()),
            amount_minor: session.amount_total.unwrap_or(parcel.cost.saturating_mul(100)),
            currency: session
                .currency
                .clone()
                .unwrap_or_else(|| self.settings.currency.clone()),
            customer_email: session.customer_email.clone(),
            payment_status: session.payment_status.as_str().to_string(),
            paid_at: Utc::now(),
        };

        if let InsertOutcome::Existing(existing) = self.payments.insert_unique(&payment).await? {
            tracing::info!(transaction_id = %transaction_id, "payment recorded by concurrent confirmation");
            return Ok(Confirmation::AlreadyProcessed {
                transaction_id,
                tracking_id: existing.tracking_id,
            });
        }

        if parcel.delivery_status == DeliveryStatus::PendingPickup {
            self.ledger
                .record(&parcel.tracking_id, DeliveryStatus::PendingPickup)
                .await;
        }

        tracing::info!(
            parcel_id = %parcel_id,
            transaction_id = %transaction_id,
            amount_minor = payment.amount_minor,
            "payment confirmed"
        );
        Ok(Confirmation::Confirmed {
            parcel_id,
            tracking_id: parcel.tracking_id,
            transaction_id,
        })
    }
}
