//! # In-Memory Backend
//!
//! Implements every repository trait over [`MemoryStore`] collections. Used
//! when no database is configured and by the test suites. State does not
//! survive a restart.

mod store;

pub use store::MemoryStore;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zap_core::{Email, ParcelId, RiderId, TrackingId, TransactionId};
use zap_state::{DeliveryStatus, RiderApproval, WorkStatus};

use crate::error::StoreError;
use crate::records::{Parcel, ParcelChange, ParcelGuard, Payment, Rider, Role, TrackingEvent, User};
use crate::repository::{
    Conditional, InsertOutcome, ParcelRepository, PaymentRepository, Repositories,
    RiderRepository, TrackingRepository, UserRepository,
};

/// All dispatch collections held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    parcels: MemoryStore<ParcelId, Parcel>,
    riders: MemoryStore<RiderId, Rider>,
    trackings: MemoryStore<TrackingId, Vec<TrackingEvent>>,
    tracking_seq: AtomicI64,
    payments: MemoryStore<TransactionId, Payment>,
    users: MemoryStore<Email, User>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh backend as a full repository set.
    pub fn repositories() -> Repositories {
        Arc::new(Self::new()).into_repositories()
    }

    pub fn into_repositories(self: Arc<Self>) -> Repositories {
        Repositories {
            parcels: self.clone(),
            riders: self.clone(),
            trackings: self.clone(),
            payments: self.clone(),
            users: self,
        }
    }

    /// Number of stored payments.
    pub fn payment_count(&self) -> usize {
        self.payments.len()
    }
}

#[async_trait]
impl ParcelRepository for MemoryBackend {
    async fn insert(&self, parcel: &Parcel) -> Result<(), StoreError> {
        self.parcels
            .insert_unique(parcel.id, parcel.clone(), |p| p.tracking_id == parcel.tracking_id)
            .map_err(|existing| {
                if existing.id == parcel.id {
                    StoreError::Duplicate {
                        kind: "parcel",
                        key: parcel.id.to_string(),
                    }
                } else {
                    StoreError::Duplicate {
                        kind: "tracking id",
                        key: parcel.tracking_id.to_string(),
                    }
                }
            })
    }

    async fn get(&self, id: ParcelId) -> Result<Option<Parcel>, StoreError> {
        Ok(self.parcels.get(&id))
    }

    async fn compare_and_set(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
        change: &ParcelChange,
        at: DateTime<Utc>,
    ) -> Result<Conditional<Parcel>, StoreError> {
        let result = self.parcels.try_update(&id, |parcel| {
            if parcel.guard() != expected {
                return Err(parcel.clone());
            }
            parcel.apply(change, at);
            Ok(parcel.clone())
        });
        Ok(conditional(result))
    }

    async fn delete_guarded(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
    ) -> Result<Conditional<Parcel>, StoreError> {
        Ok(conditional(
            self.parcels.remove_unless(&id, |parcel| parcel.guard() != expected),
        ))
    }
}

#[async_trait]
impl RiderRepository for MemoryBackend {
    async fn insert(&self, rider: &Rider) -> Result<(), StoreError> {
        self.riders
            .insert_unique(rider.id, rider.clone(), |r| r.email == rider.email)
            .map_err(|_| StoreError::Duplicate {
                kind: "rider",
                key: rider.email.to_string(),
            })
    }

    async fn get(&self, id: RiderId) -> Result<Option<Rider>, StoreError> {
        Ok(self.riders.get(&id))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Rider>, StoreError> {
        Ok(self.riders.find(|r| &r.email == email))
    }

    async fn set_work_status(
        &self,
        id: RiderId,
        status: WorkStatus,
    ) -> Result<Option<Rider>, StoreError> {
        Ok(self.riders.update(&id, |r| r.work_status = status))
    }

    async fn reserve(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError> {
        let result = self.riders.try_update(&id, |rider| {
            if !rider.can_take_assignment() {
                return Err(rider.clone());
            }
            rider.work_status = WorkStatus::InDelivery;
            Ok(rider.clone())
        });
        Ok(conditional(result))
    }

    async fn set_approval(
        &self,
        id: RiderId,
        approval: RiderApproval,
    ) -> Result<Option<Rider>, StoreError> {
        Ok(self.riders.update(&id, |r| {
            r.status = approval;
            r.work_status = WorkStatus::Available;
        }))
    }

    async fn remove_idle(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError> {
        let result = self
            .riders
            .remove_unless(&id, |rider| rider.work_status == WorkStatus::InDelivery);
        if let Some(Ok(_)) = result {
            self.parcels.update_where(
                |parcel| parcel.rider_id == Some(id),
                |parcel| parcel.rider_id = None,
            );
        }
        Ok(conditional(result))
    }
}

fn conditional<T>(result: Option<Result<T, T>>) -> Conditional<T> {
    match result {
        Some(Ok(applied)) => Conditional::Applied(applied),
        Some(Err(current)) => Conditional::Rejected(current),
        None => Conditional::Missing,
    }
}

#[async_trait]
impl TrackingRepository for MemoryBackend {
    async fn append_if_changed(
        &self,
        tracking_id: &TrackingId,
        status: DeliveryStatus,
        details: &str,
        at: DateTime<Utc>,
    ) -> Result<InsertOutcome<TrackingEvent>, StoreError> {
        Ok(self.trackings.upsert_with(tracking_id.clone(), |events| {
            if let Some(last) = events.last().filter(|e| e.status == status) {
                return InsertOutcome::Existing(last.clone());
            }
            let event = TrackingEvent {
                tracking_id: tracking_id.clone(),
                status,
                details: details.to_string(),
                created_at: at,
                seq: self.tracking_seq.fetch_add(1, Ordering::SeqCst) + 1,
            };
            events.push(event.clone());
            InsertOutcome::Inserted(event)
        }))
    }

    async fn history(&self, tracking_id: &TrackingId) -> Result<Vec<TrackingEvent>, StoreError> {
        Ok(self.trackings.get(tracking_id).unwrap_or_default())
    }
}

#[async_trait]
impl PaymentRepository for MemoryBackend {
    async fn find_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Payment>, StoreError> {
        Ok(self.payments.get(transaction_id))
    }

    async fn insert_unique(&self, payment: &Payment) -> Result<InsertOutcome<Payment>, StoreError> {
        Ok(
            match self
                .payments
                .insert_unique(payment.transaction_id.clone(), payment.clone(), |_| false)
            {
                Ok(()) => InsertOutcome::Inserted(payment.clone()),
                Err(existing) => InsertOutcome::Existing(existing),
            },
        )
    }
}

#[async_trait]
impl UserRepository for MemoryBackend {
    async fn insert_if_absent(&self, user: &User) -> Result<InsertOutcome<User>, StoreError> {
        Ok(
            match self.users.insert_unique(user.email.clone(), user.clone(), |_| false) {
                Ok(()) => InsertOutcome::Inserted(user.clone()),
                Err(existing) => InsertOutcome::Existing(existing),
            },
        )
    }

    async fn get(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(email))
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError> {
        Ok(self.users.update(email, |u| u.role = role))
    }
}
