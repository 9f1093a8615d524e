//! # Tracking Ledger
//!
//! Append-only, deduplicating log of delivery status events per tracking id.
//!
//! An append is suppressed when the most recent *stored* event for the
//! tracking id already carries the same status. The comparison is made by
//! the repository in the same atomic step as the insert, so two concurrent
//! appends of one status yield a single event.
//!
//! Lifecycle operations write through [`TrackingLedger::record`], which never
//! fails: a store error is reported on the `zap::ops` tracing target and the
//! state transition that triggered it stands.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zap_core::TrackingId;
use zap_state::DeliveryStatus;

use crate::error::DispatchError;
use crate::records::TrackingEvent;
use crate::repository::{InsertOutcome, TrackingRepository};

/// What happened to the ledger entry of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LedgerWrite {
    /// A new event was stored.
    Inserted,
    /// The latest event already had this status; nothing was stored.
    Duplicate,
    /// The store failed; the event is missing from the log.
    Failed,
}

impl LedgerWrite {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

#[derive(Clone)]
pub struct TrackingLedger {
    repo: Arc<dyn TrackingRepository>,
}

impl TrackingLedger {
    pub fn new(repo: Arc<dyn TrackingRepository>) -> Self {
        Self { repo }
    }

    /// Append `status` unless it repeats the latest stored event.
    pub async fn append(
        &self,
        tracking_id: &TrackingId,
        status: DeliveryStatus,
    ) -> Result<LedgerWrite, DispatchError> {
        let outcome = self
            .repo
            .append_if_changed(tracking_id, status, &status.details(), Utc::now())
            .await?;
        Ok(match outcome {
            InsertOutcome::Inserted(event) => {
                tracing::debug!(tracking_id = %tracking_id, status = %status, seq = event.seq, "tracking event appended");
                LedgerWrite::Inserted
            }
            InsertOutcome::Existing(_) => LedgerWrite::Duplicate,
        })
    }

    /// Append, converting any failure into [`LedgerWrite::Failed`].
    pub async fn record(&self, tracking_id: &TrackingId, status: DeliveryStatus) -> LedgerWrite {
        match self.append(tracking_id, status).await {
            Ok(write) => write,
            Err(e) => {
                tracing::error!(
                    target: "zap::ops",
                    tracking_id = %tracking_id,
                    status = %status,
                    error = %e,
                    "tracking event lost: ledger append failed after state transition"
                );
                LedgerWrite::Failed
            }
        }
    }

    /// All events for a tracking id in append order.
    ///
    /// Ordered by `seq`, the same order the dedup check uses. `created_at` is
    /// stamped before the atomic step and may disagree under contention.
    pub async fn history(&self, tracking_id: &TrackingId) -> Result<Vec<TrackingEvent>, DispatchError> {
        let mut events = self.repo.history(tracking_id).await?;
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }
}
