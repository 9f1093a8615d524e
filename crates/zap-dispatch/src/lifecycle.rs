//! # Parcel Lifecycle
//!
//! Drives a parcel through the delivery state machine of
//! [`zap_state::DeliveryStatus`], keeping the assigned rider's work status
//! and the tracking ledger in step.
//!
//! Every transition follows the same steps:
//!
//! 1. Load the parcel and compute the next status with
//!    [`DeliveryStatus::apply_with`]. Rejected actions fail with
//!    `InvalidTransition` before anything is written.
//! 2. Write the change as a compare-and-set predicated on the observed
//!    status and rider. A concurrent writer makes this fail with `Conflict`.
//! 3. Synchronize rider availability.
//! 4. Record the new status in the ledger. Ledger failures are reported in
//!    the outcome and on the operator channel, never as an error.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use zap_core::{ParcelId, RiderId, TrackingId};
use zap_state::{AssignmentPolicy, DeliveryStatus, LifecycleAction, PaymentStatus};

use crate::error::{DispatchError, StoreError};
use crate::ledger::{LedgerWrite, TrackingLedger};
use crate::records::{AssignedRider, Parcel, ParcelChange, ParcelDraft};
use crate::repository::{Conditional, ParcelRepository};
use crate::rider::RiderAssignment;

/// Attempts at minting an unused tracking id before giving up.
const MINT_ATTEMPTS: usize = 3;

/// Result of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub parcel: Parcel,
    pub ledger: LedgerWrite,
}

#[derive(Clone)]
pub struct ParcelLifecycle {
    parcels: Arc<dyn ParcelRepository>,
    riders: RiderAssignment,
    ledger: TrackingLedger,
    policy: AssignmentPolicy,
}

impl ParcelLifecycle {
    pub fn new(
        parcels: Arc<dyn ParcelRepository>,
        riders: RiderAssignment,
        ledger: TrackingLedger,
        policy: AssignmentPolicy,
    ) -> Self {
        Self {
            parcels,
            riders,
            ledger,
            policy,
        }
    }

    pub fn policy(&self) -> AssignmentPolicy {
        self.policy
    }

    pub async fn get(&self, id: ParcelId) -> Result<Parcel, DispatchError> {
        self.parcels
            .get(id)
            .await?
            .ok_or_else(|| DispatchError::parcel_not_found(id))
    }

    /// Create a parcel in `parcel-created`/`unpaid` under a fresh tracking id.
    pub async fn create(&self, draft: ParcelDraft) -> Result<TransitionOutcome, DispatchError> {
        let parcel_name = draft.parcel_name.trim().to_string();
        if parcel_name.is_empty() {
            return Err(DispatchError::Validation("parcel name must not be empty".into()));
        }
        if draft.cost <= 0 {
            return Err(DispatchError::Validation(format!(
                "cost must be positive, got {}",
                draft.cost
            )));
        }

        let now = Utc::now();
        let mut parcel = Parcel {
            id: ParcelId::new(),
            tracking_id: TrackingId::mint(),
            delivery_status: DeliveryStatus::ParcelCreated,
            payment_status: PaymentStatus::Unpaid,
            sender_email: draft.sender_email,
            sender_name: draft.sender_name.trim().to_string(),
            parcel_name,
            cost: draft.cost,
            details: draft.details,
            rider_id: None,
            rider_name: None,
            rider_email: None,
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 1;
        loop {
            match self.parcels.insert(&parcel).await {
                Ok(()) => break,
                Err(StoreError::Duplicate { kind: "tracking id", .. }) if attempt < MINT_ATTEMPTS => {
                    tracing::warn!(tracking_id = %parcel.tracking_id, attempt, "tracking id collision, reminting");
                    parcel.tracking_id = TrackingId::mint();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(parcel_id = %parcel.id, tracking_id = %parcel.tracking_id, "parcel created");
        let ledger = self
            .ledger
            .record(&parcel.tracking_id, DeliveryStatus::ParcelCreated)
            .await;
        Ok(TransitionOutcome { parcel, ledger })
    }

    /// Pay: `parcel-created → pending-pickup`, `unpaid → paid`.
    ///
    /// A parcel that is already paid is returned untouched, so repeated
    /// confirmations of one payment are harmless.
    pub async fn mark_paid(&self, id: ParcelId) -> Result<TransitionOutcome, DispatchError> {
        let parcel = self.get(id).await?;
        if parcel.payment_status.is_paid() {
            return Ok(self.already_paid(parcel).await);
        }

        let next = parcel
            .delivery_status
            .apply_with(LifecycleAction::Pay, self.policy)?;
        let mut change = parcel.change();
        change.delivery_status = next;
        change.payment_status = PaymentStatus::Paid;

        let parcel = match self.parcels.compare_and_set(id, parcel.guard(), &change, Utc::now()).await? {
            Conditional::Applied(updated) => updated,
            Conditional::Rejected(current) if current.payment_status.is_paid() => {
                return Ok(self.already_paid(current).await);
            }
            Conditional::Rejected(current) => return Err(stale(&current)),
            Conditional::Missing => return Err(DispatchError::parcel_not_found(id)),
        };

        tracing::info!(parcel_id = %id, tracking_id = %parcel.tracking_id, "parcel paid");
        let ledger = self.ledger.record(&parcel.tracking_id, next).await;
        Ok(TransitionOutcome { parcel, ledger })
    }

    async fn already_paid(&self, parcel: Parcel) -> TransitionOutcome {
        let ledger = if parcel.delivery_status == DeliveryStatus::PendingPickup {
            self.ledger
                .record(&parcel.tracking_id, DeliveryStatus::PendingPickup)
                .await
        } else {
            LedgerWrite::Duplicate
        };
        TransitionOutcome { parcel, ledger }
    }

    /// Assign: put a rider on a paid parcel, or swap the assigned rider.
    ///
    /// Under [`AssignmentPolicy::Strict`] the rider is claimed with a
    /// conditional reservation and a busy rider is refused. Under
    /// [`AssignmentPolicy::Override`] the rider is marked busy
    /// unconditionally. In both cases a replaced rider is released.
    pub async fn assign_rider(
        &self,
        id: ParcelId,
        rider_id: RiderId,
    ) -> Result<TransitionOutcome, DispatchError> {
        let parcel = self.get(id).await?;
        let next = parcel
            .delivery_status
            .apply_with(LifecycleAction::Assign, self.policy)?;

        let rider = self.riders.get(rider_id).await?;
        if !rider.status.is_approved() {
            return Err(DispatchError::RiderUnavailable {
                rider_id,
                reason: "not approved",
            });
        }

        let previous = parcel.rider_id;
        if previous == Some(rider_id) && parcel.delivery_status == next {
            let ledger = self.ledger.record(&parcel.tracking_id, next).await;
            return Ok(TransitionOutcome { parcel, ledger });
        }

        let rider = match self.policy {
            AssignmentPolicy::Strict => self.riders.reserve(rider_id).await?,
            AssignmentPolicy::Override => self.riders.assign(rider_id).await?,
        };

        let mut change = parcel.change();
        change.delivery_status = next;
        change.rider = Some(AssignedRider {
            id: rider.id,
            name: rider.name.clone(),
            email: Some(rider.email.clone()),
        });

        let parcel = match self.commit(&parcel, &change).await {
            Ok(updated) => updated,
            Err(e) => {
                if self.policy == AssignmentPolicy::Strict {
                    self.riders.release_after_commit(rider_id).await;
                }
                return Err(e);
            }
        };

        if let Some(prev) = previous.filter(|p| *p != rider_id) {
            self.riders.release_after_commit(prev).await;
        }

        tracing::info!(
            parcel_id = %id,
            rider_id = %rider_id,
            replaced = ?previous,
            policy = %self.policy,
            "rider assigned"
        );
        let ledger = self.ledger.record(&parcel.tracking_id, next).await;
        Ok(TransitionOutcome { parcel, ledger })
    }

    /// Advance: the assigned rider reports progress.
    ///
    /// Reporting `parcel-delivered` always frees the rider, including when
    /// the parcel was already delivered.
    pub async fn advance_status(
        &self,
        id: ParcelId,
        rider_id: RiderId,
        new_status: DeliveryStatus,
    ) -> Result<TransitionOutcome, DispatchError> {
        let parcel = self.get(id).await?;
        ensure_assigned(&parcel, rider_id)?;

        let next = parcel
            .delivery_status
            .apply_with(LifecycleAction::Advance(new_status), self.policy)?;

        let parcel = if next == parcel.delivery_status {
            parcel
        } else {
            let mut change = parcel.change();
            change.delivery_status = next;
            self.commit(&parcel, &change).await?
        };

        if next == DeliveryStatus::ParcelDelivered {
            self.riders.release_after_commit(rider_id).await;
        }

        tracing::info!(parcel_id = %id, rider_id = %rider_id, status = %next, "parcel status advanced");
        let ledger = self.ledger.record(&parcel.tracking_id, next).await;
        Ok(TransitionOutcome { parcel, ledger })
    }

    /// Reject: the assigned rider hands the parcel back to the pickup pool.
    pub async fn reject(
        &self,
        id: ParcelId,
        rider_id: RiderId,
    ) -> Result<TransitionOutcome, DispatchError> {
        let parcel = self.get(id).await?;
        ensure_assigned(&parcel, rider_id)?;

        let next = parcel
            .delivery_status
            .apply_with(LifecycleAction::Reject, self.policy)?;
        let mut change = parcel.change();
        change.delivery_status = next;
        change.rider = None;

        let parcel = self.commit(&parcel, &change).await?;
        self.riders.release_after_commit(rider_id).await;

        tracing::info!(parcel_id = %id, rider_id = %rider_id, "parcel rejected by rider");
        let ledger = self.ledger.record(&parcel.tracking_id, next).await;
        Ok(TransitionOutcome { parcel, ledger })
    }

    /// Cancel: withdraw a parcel that has not been paid.
    ///
    /// The parcel record is deleted; its tracking history stays readable. A
    /// payment confirmed in the meantime makes this fail with `Conflict`.
    pub async fn cancel(&self, id: ParcelId) -> Result<Parcel, DispatchError> {
        let parcel = self.get(id).await?;
        parcel.delivery_status.check_cancel()?;

        match self.parcels.delete_guarded(id, parcel.guard()).await? {
            Conditional::Applied(deleted) => {
                tracing::info!(parcel_id = %id, tracking_id = %deleted.tracking_id, "parcel cancelled");
                Ok(deleted)
            }
            Conditional::Rejected(current) => Err(stale(&current)),
            Conditional::Missing => Err(DispatchError::parcel_not_found(id)),
        }
    }

    async fn commit(&self, observed: &Parcel, change: &ParcelChange) -> Result<Parcel, DispatchError> {
        match self
            .parcels
            .compare_and_set(observed.id, observed.guard(), change, Utc::now())
            .await?
        {
            Conditional::Applied(updated) => Ok(updated),
            Conditional::Rejected(current) => Err(stale(&current)),
            Conditional::Missing => Err(DispatchError::parcel_not_found(observed.id)),
        }
    }
}

fn ensure_assigned(parcel: &Parcel, rider_id: RiderId) -> Result<(), DispatchError> {
    if parcel.rider_id == Some(rider_id) {
        Ok(())
    } else {
        Err(DispatchError::NotAssignedRider {
            parcel_id: parcel.id,
            rider_id,
        })
    }
}

fn stale(current: &Parcel) -> DispatchError {
    DispatchError::Conflict(format!(
        "parcel {} changed concurrently (now {})",
        current.id, current.delivery_status
    ))
}
