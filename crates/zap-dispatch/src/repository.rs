//! # Repository Traits
//!
//! One trait per entity. Every read-then-write hazard in the dispatch flow
//! is expressed as a single conditional write here, so each backend can
//! make it atomic in its own way:
//!
//! | Hazard | Method |
//! |---|---|
//! | duplicate tracking event | [`TrackingRepository::append_if_changed`] |
//! | duplicate payment | [`PaymentRepository::insert_unique`] |
//! | lost parcel update | [`ParcelRepository::compare_and_set`] |
//! | double-booked rider | [`RiderRepository::reserve`] |
//! | withdrawing a paid parcel | [`ParcelRepository::delete_guarded`] |
//! | removing a rider mid-delivery | [`RiderRepository::remove_idle`] |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zap_core::{Email, ParcelId, RiderId, TrackingId, TransactionId};
use zap_state::{DeliveryStatus, RiderApproval, WorkStatus};

use crate::error::StoreError;
use crate::records::{Parcel, ParcelChange, ParcelGuard, Payment, Rider, Role, TrackingEvent, User};

/// Outcome of an insert that may collide with an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<T> {
    /// The record was written.
    Inserted(T),
    /// Nothing was written; this is the record that prevented it.
    Existing(T),
}

impl<T> InsertOutcome<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Inserted(v) | Self::Existing(v) => v,
        }
    }
}

/// Outcome of a conditional write on a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conditional<T> {
    /// Precondition held; the updated record.
    Applied(T),
    /// Precondition failed; the record as currently stored.
    Rejected(T),
    /// No such record.
    Missing,
}

#[async_trait]
pub trait ParcelRepository: Send + Sync {
    /// Insert a new parcel. Fails with [`StoreError::Duplicate`] when the
    /// tracking id is already taken.
    async fn insert(&self, parcel: &Parcel) -> Result<(), StoreError>;

    async fn get(&self, id: ParcelId) -> Result<Option<Parcel>, StoreError>;

    /// Write `change` only if the stored parcel still matches `expected`.
    async fn compare_and_set(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
        change: &ParcelChange,
        at: DateTime<Utc>,
    ) -> Result<Conditional<Parcel>, StoreError>;

    /// Delete only if the stored parcel still matches `expected`.
    /// `Applied` carries the deleted record.
    async fn delete_guarded(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
    ) -> Result<Conditional<Parcel>, StoreError>;
}

#[async_trait]
pub trait RiderRepository: Send + Sync {
    /// Insert a new rider. Fails with [`StoreError::Duplicate`] when a rider
    /// with the same email exists.
    async fn insert(&self, rider: &Rider) -> Result<(), StoreError>;

    async fn get(&self, id: RiderId) -> Result<Option<Rider>, StoreError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Rider>, StoreError>;

    /// Unconditionally set the work status. `None` if the rider is unknown.
    async fn set_work_status(
        &self,
        id: RiderId,
        status: WorkStatus,
    ) -> Result<Option<Rider>, StoreError>;

    /// `available → in_delivery`, only for an approved, available rider.
    async fn reserve(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError>;

    /// Record a review decision and reset the work status to available.
    async fn set_approval(
        &self,
        id: RiderId,
        approval: RiderApproval,
    ) -> Result<Option<Rider>, StoreError>;

    /// Delete a rider who is not `in_delivery`. Parcels that named the rider
    /// keep the copied name and email but lose the rider id.
    async fn remove_idle(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError>;
}

#[async_trait]
pub trait TrackingRepository: Send + Sync {
    /// Append an event unless the latest stored event for the tracking id
    /// already carries `status`. The comparison and the insert are atomic.
    async fn append_if_changed(
        &self,
        tracking_id: &TrackingId,
        status: DeliveryStatus,
        details: &str,
        at: DateTime<Utc>,
    ) -> Result<InsertOutcome<TrackingEvent>, StoreError>;

    /// All events for a tracking id in ascending `seq` order.
    async fn history(&self, tracking_id: &TrackingId) -> Result<Vec<TrackingEvent>, StoreError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Payment>, StoreError>;

    /// Insert guarded by the transaction id uniqueness constraint.
    async fn insert_unique(&self, payment: &Payment) -> Result<InsertOutcome<Payment>, StoreError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_if_absent(&self, user: &User) -> Result<InsertOutcome<User>, StoreError>;

    async fn get(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// `None` if no user has this email.
    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError>;
}

/// The full set of repositories a dispatch instance runs on.
#[derive(Clone)]
pub struct Repositories {
    pub parcels: Arc<dyn ParcelRepository>,
    pub riders: Arc<dyn RiderRepository>,
    pub trackings: Arc<dyn TrackingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
