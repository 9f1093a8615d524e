//! # Riders
//!
//! [`RiderAssignment`] owns a rider's work status, the single source of
//! truth for whether the rider may receive a new parcel. [`RiderOnboarding`]
//! handles applications and the admin review that approves riders.

use std::sync::Arc;

use chrono::Utc;
use zap_core::{Email, RiderId};
use zap_state::{RiderApproval, WorkStatus};

use crate::error::DispatchError;
use crate::records::{Rider, Role};
use crate::repository::{Conditional, RiderRepository};
use crate::users::UserDirectory;

// ─── Assignment ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RiderAssignment {
    repo: Arc<dyn RiderRepository>,
}

impl RiderAssignment {
    pub fn new(repo: Arc<dyn RiderRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: RiderId) -> Result<Rider, DispatchError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DispatchError::rider_not_found(id))
    }

    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Rider>, DispatchError> {
        Ok(self.repo.find_by_email(email).await?)
    }

    /// Mark the rider busy regardless of current state.
    pub async fn assign(&self, id: RiderId) -> Result<Rider, DispatchError> {
        self.set(id, WorkStatus::InDelivery).await
    }

    /// Claim an approved, available rider.
    pub async fn reserve(&self, id: RiderId) -> Result<Rider, DispatchError> {
        match self.repo.reserve(id).await? {
            Conditional::Applied(rider) => Ok(rider),
            Conditional::Rejected(rider) => Err(DispatchError::RiderUnavailable {
                rider_id: id,
                reason: if rider.status.is_approved() {
                    "already on a delivery"
                } else {
                    "not approved"
                },
            }),
            Conditional::Missing => Err(DispatchError::rider_not_found(id)),
        }
    }

    /// Mark the rider available. Idempotent.
    pub async fn release(&self, id: RiderId) -> Result<Rider, DispatchError> {
        self.set(id, WorkStatus::Available).await
    }

    async fn set(&self, id: RiderId, status: WorkStatus) -> Result<Rider, DispatchError> {
        let rider = self
            .repo
            .set_work_status(id, status)
            .await?
            .ok_or_else(|| DispatchError::rider_not_found(id))?;
        tracing::debug!(rider_id = %id, work_status = %status, "rider work status set");
        Ok(rider)
    }

    /// Release without failing the caller; used once a parcel write has
    /// already committed.
    pub(crate) async fn release_after_commit(&self, id: RiderId) {
        if let Err(e) = self.release(id).await {
            tracing::error!(
                target: "zap::ops",
                rider_id = %id,
                error = %e,
                "rider left busy: release failed after parcel transition"
            );
        }
    }
}

// ─── Onboarding ──────────────────────────────────────────────────────

/// Rider application fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiderApplication {
    pub name: String,
    pub email: Email,
    pub district: String,
}

#[derive(Clone)]
pub struct RiderOnboarding {
    repo: Arc<dyn RiderRepository>,
    users: UserDirectory,
}

impl RiderOnboarding {
    pub fn new(repo: Arc<dyn RiderRepository>, users: UserDirectory) -> Self {
        Self { repo, users }
    }

    /// File an application. The rider starts `pending` and `available`.
    pub async fn apply(&self, application: RiderApplication) -> Result<Rider, DispatchError> {
        let name = application.name.trim();
        let district = application.district.trim();
        if name.is_empty() {
            return Err(DispatchError::Validation("rider name must not be empty".into()));
        }
        if district.is_empty() {
            return Err(DispatchError::Validation("district must not be empty".into()));
        }

        let rider = Rider {
            id: RiderId::new(),
            name: name.to_string(),
            email: application.email,
            district: district.to_string(),
            status: RiderApproval::Pending,
            work_status: WorkStatus::Available,
            created_at: Utc::now(),
        };
        self.repo.insert(&rider).await?;
        tracing::info!(rider_id = %rider.id, district = %rider.district, "rider application filed");
        Ok(rider)
    }

    /// Approve or reject an application. Approval grants the rider role.
    pub async fn review(&self, id: RiderId, decision: RiderApproval) -> Result<Rider, DispatchError> {
        if decision == RiderApproval::Pending {
            return Err(DispatchError::Validation(
                "review decision must be approved or rejected".into(),
            ));
        }
        let rider = self
            .repo
            .set_approval(id, decision)
            .await?
            .ok_or_else(|| DispatchError::rider_not_found(id))?;

        if decision == RiderApproval::Approved {
            self.users.grant(&rider.email, Role::Rider, &rider.name).await?;
        }
        tracing::info!(rider_id = %id, decision = %decision, "rider reviewed");
        Ok(rider)
    }

    /// Remove a rider. Refused while the rider is on a delivery. A user
    /// holding the rider role drops back to `user`.
    pub async fn remove(&self, id: RiderId) -> Result<Rider, DispatchError> {
        let rider = match self.repo.remove_idle(id).await? {
            Conditional::Applied(rider) => rider,
            Conditional::Rejected(_) => {
                return Err(DispatchError::RiderUnavailable {
                    rider_id: id,
                    reason: "on a delivery",
                })
            }
            Conditional::Missing => return Err(DispatchError::rider_not_found(id)),
        };

        if self.users.role_of(&rider.email).await? == Role::Rider {
            self.users.set_role(&rider.email, Role::User).await?;
        }
        tracing::info!(rider_id = %id, "rider removed");
        Ok(rider)
    }
}
