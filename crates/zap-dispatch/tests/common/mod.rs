//! Shared fixtures for the dispatch integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use zap_core::{CheckoutSessionId, Email};
use zap_dispatch::memory::MemoryBackend;
use zap_dispatch::testing::FakeProcessor;
use zap_dispatch::{
    Confirmation, Dispatch, DispatchSettings, Parcel, ParcelDraft, PaymentProcessor,
    Repositories, Rider, RiderApplication,
};
use zap_state::{AssignmentPolicy, DeliveryStatus, RiderApproval};

pub struct Harness {
    pub dispatch: Dispatch,
    pub backend: Arc<MemoryBackend>,
    pub processor: Arc<FakeProcessor>,
}

pub fn harness(policy: AssignmentPolicy) -> Harness {
    let backend = Arc::new(MemoryBackend::new());
    harness_with(policy, backend.clone(), backend.clone().into_repositories())
}

pub fn harness_with(
    policy: AssignmentPolicy,
    backend: Arc<MemoryBackend>,
    repos: Repositories,
) -> Harness {
    let processor = Arc::new(FakeProcessor::new());
    let dispatch = Dispatch::new(
        repos,
        Some(processor.clone() as Arc<dyn PaymentProcessor>),
        DispatchSettings {
            policy,
            ..Default::default()
        },
    );
    Harness {
        dispatch,
        backend,
        processor,
    }
}

pub fn email(s: &str) -> Email {
    Email::new(s).unwrap()
}

impl Harness {
    pub async fn create_parcel(&self, cost: i64) -> Parcel {
        self.dispatch
            .lifecycle
            .create(ParcelDraft {
                sender_email: email("sender@example.com"),
                sender_name: "Sam Sender".into(),
                parcel_name: "Books".into(),
                cost,
                details: serde_json::json!({ "receiverDistrict": "Dhaka" }),
            })
            .await
            .unwrap()
            .parcel
    }

    /// Open a checkout for the parcel and settle it at the processor.
    pub async fn settle_checkout(&self, parcel: &Parcel, transaction_id: &str) -> CheckoutSessionId {
        let link = self
            .dispatch
            .reconciler
            .open_checkout(parcel.id)
            .await
            .unwrap();
        self.processor.pay(&link.session_id, transaction_id);
        CheckoutSessionId::new(link.session_id).unwrap()
    }

    pub async fn paid_parcel(&self) -> Parcel {
        let parcel = self.create_parcel(500).await;
        let session = self.settle_checkout(&parcel, &format!("pi_{}", parcel.id)).await;
        let confirmation = self.dispatch.reconciler.confirm(&session).await.unwrap();
        assert!(matches!(confirmation, Confirmation::Confirmed { .. }));
        self.dispatch.lifecycle.get(parcel.id).await.unwrap()
    }

    pub async fn approved_rider(&self, address: &str) -> Rider {
        let rider = self
            .dispatch
            .onboarding
            .apply(RiderApplication {
                name: "Rina Rider".into(),
                email: email(address),
                district: "Dhaka".into(),
            })
            .await
            .unwrap();
        self.dispatch
            .onboarding
            .review(rider.id, RiderApproval::Approved)
            .await
            .unwrap()
    }

    pub async fn statuses(&self, parcel: &Parcel) -> Vec<DeliveryStatus> {
        self.dispatch
            .ledger
            .history(&parcel.tracking_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.status)
            .collect()
    }
}
