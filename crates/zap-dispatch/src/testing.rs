//! In-process payment processor for tests and local development.
//!
//! Sessions are created unpaid; a test settles them with
//! [`FakeProcessor::pay`] before confirming.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use zap_checkout::{
    CheckoutError, CheckoutSession, CreateSessionRequest, SessionPaymentStatus, SessionStatus,
};
use zap_core::CheckoutSessionId;

use crate::processor::PaymentProcessor;

#[derive(Debug, Default)]
pub struct FakeProcessor {
    sessions: Mutex<HashMap<String, SessionStatus>>,
    created: AtomicUsize,
    retrievals: AtomicUsize,
    unreachable: AtomicBool,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle a session as paid under the given transaction id.
    pub fn pay(&self, session_id: &str, transaction_id: &str) {
        if let Some(session) = self.sessions.lock().get_mut(session_id) {
            session.payment_status = SessionPaymentStatus::Paid;
            session.payment_intent = Some(transaction_id.to_string());
        }
    }

    /// Make every subsequent call fail as a transport error would.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn session(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn retrievals(&self) -> usize {
        self.retrievals.load(Ordering::SeqCst)
    }

    fn check_reachable(&self, endpoint: &str) -> Result<(), CheckoutError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CheckoutError::ApiError {
                endpoint: endpoint.to_string(),
                status: 503,
                body: "processor unreachable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    async fn create_checkout_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        self.check_reachable("POST /checkout/sessions")?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        let status = SessionStatus {
            id: id.clone(),
            payment_intent: None,
            payment_status: SessionPaymentStatus::Unpaid,
            amount_total: Some(req.amount_minor),
            currency: Some(req.currency.clone()),
            customer_email: req.customer_email.clone(),
            metadata: req.metadata.clone(),
        };
        self.sessions.lock().insert(id.clone(), status);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/pay/{id}")),
            id,
        })
    }

    async fn retrieve_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, CheckoutError> {
        self.retrievals.fetch_add(1, Ordering::SeqCst);
        self.check_reachable("GET /checkout/sessions/{id}")?;
        self.sessions
            .lock()
            .get(session_id.as_str())
            .cloned()
            .ok_or_else(|| CheckoutError::ApiError {
                endpoint: "GET /checkout/sessions/{id}".to_string(),
                status: 404,
                body: format!("No such checkout.session: {session_id}"),
            })
    }
}
