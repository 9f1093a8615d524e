//! # Payment Processor Seam
//!
//! The reconciler talks to the payment processor only through
//! [`PaymentProcessor`]. Production wires in [`zap_checkout::CheckoutClient`];
//! tests wire in [`crate::testing::FakeProcessor`].

use async_trait::async_trait;
use zap_checkout::{CheckoutClient, CheckoutError, CheckoutSession, CreateSessionRequest, SessionStatus};
use zap_core::CheckoutSessionId;

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_checkout_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError>;

    async fn retrieve_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, CheckoutError>;
}

#[async_trait]
impl PaymentProcessor for CheckoutClient {
    async fn create_checkout_session(
        &self,
        req: &CreateSessionRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        CheckoutClient::create_checkout_session(self, req).await
    }

    async fn retrieve_session(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<SessionStatus, CheckoutError> {
        CheckoutClient::retrieve_session(self, session_id).await
    }
}
