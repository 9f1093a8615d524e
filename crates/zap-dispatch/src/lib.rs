//! # zap-dispatch: Parcel Dispatch Domain
//!
//! The components that move a parcel from creation to delivery:
//!
//! - **TrackingLedger** (`ledger.rs`): append-only, deduplicating status log.
//! - **RiderAssignment** (`rider.rs`): rider availability, plus onboarding.
//! - **ParcelLifecycle** (`lifecycle.rs`): the delivery state machine applied
//!   to stored parcels with compare-and-set writes.
//! - **PaymentReconciler** (`reconciler.rs`): idempotent checkout
//!   confirmation that gates the first lifecycle transition.
//!
//! Components depend on repository traits (`repository.rs`), never on a
//! concrete store. [`memory::MemoryBackend`] implements them in process; the
//! API crate provides a Postgres implementation.
//!
//! [`Dispatch`] wires one instance of every component over a shared
//! repository set.

pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod processor;
pub mod reconciler;
pub mod records;
pub mod repository;
pub mod rider;
pub mod testing;
pub mod users;

use std::sync::Arc;

pub use error::{DispatchError, StoreError};
pub use ledger::{LedgerWrite, TrackingLedger};
pub use lifecycle::{ParcelLifecycle, TransitionOutcome};
pub use processor::PaymentProcessor;
pub use reconciler::{CheckoutLink, CheckoutSettings, Confirmation, PaymentReconciler};
pub use records::{Parcel, ParcelDraft, Payment, Rider, Role, TrackingEvent, User};
pub use repository::Repositories;
pub use rider::{RiderApplication, RiderAssignment, RiderOnboarding};
pub use users::UserDirectory;

use zap_state::AssignmentPolicy;

/// Runtime knobs for a dispatch instance.
#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    pub policy: AssignmentPolicy,
    pub checkout: CheckoutSettings,
}

/// Every dispatch component, wired over one repository set.
#[derive(Clone)]
pub struct Dispatch {
    pub ledger: TrackingLedger,
    pub riders: RiderAssignment,
    pub onboarding: RiderOnboarding,
    pub lifecycle: ParcelLifecycle,
    pub reconciler: PaymentReconciler,
    pub users: UserDirectory,
}

impl Dispatch {
    pub fn new(
        repos: Repositories,
        processor: Option<Arc<dyn PaymentProcessor>>,
        settings: DispatchSettings,
    ) -> Self {
        let ledger = TrackingLedger::new(repos.trackings);
        let users = UserDirectory::new(repos.users);
        let riders = RiderAssignment::new(repos.riders.clone());
        let onboarding = RiderOnboarding::new(repos.riders, users.clone());
        let lifecycle = ParcelLifecycle::new(
            repos.parcels,
            riders.clone(),
            ledger.clone(),
            settings.policy,
        );
        let reconciler = PaymentReconciler::new(
            processor,
            repos.payments,
            lifecycle.clone(),
            ledger.clone(),
            settings.checkout,
        );

        Self {
            ledger,
            riders,
            onboarding,
            lifecycle,
            reconciler,
            users,
        }
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("policy", &self.lifecycle.policy())
            .field("checkout_enabled", &self.reconciler.is_enabled())
            .finish_non_exhaustive()
    }
}
