//! Payment persistence. A payment row is written once per processor
//! transaction id; the primary key is the idempotency guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zap_core::{ParcelId, TrackingId, TransactionId};
use zap_dispatch::repository::{InsertOutcome, PaymentRepository};
use zap_dispatch::{Payment, StoreError};

use super::{backend, corrupt, PgBackend};

const COLUMNS: &str = "transaction_id, tracking_id, parcel_id, parcel_name, amount_minor, \
     currency, customer_email, payment_status, paid_at";

pub async fn get_by_transaction(
    pool: &PgPool,
    transaction_id: &TransactionId,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM payments WHERE transaction_id = $1");
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(transaction_id.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Insert unless the transaction id is already recorded. `None` on conflict.
pub async fn insert_if_absent(
    pool: &PgPool,
    payment: &Payment,
) -> Result<Option<PaymentRow>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO payments (transaction_id, tracking_id, parcel_id, parcel_name,
         amount_minor, currency, customer_email, payment_status, paid_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (transaction_id) DO NOTHING
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, PaymentRow>(&sql)
        .bind(payment.transaction_id.as_str())
        .bind(payment.tracking_id.as_str())
        .bind(*payment.parcel_id.as_uuid())
        .bind(&payment.parcel_name)
        .bind(payment.amount_minor)
        .bind(&payment.currency)
        .bind(&payment.customer_email)
        .bind(&payment.payment_status)
        .bind(payment.paid_at)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[derive(sqlx::FromRow)]
pub struct PaymentRow {
    transaction_id: String,
    tracking_id: String,
    parcel_id: Uuid,
    parcel_name: String,
    amount_minor: i64,
    currency: String,
    customer_email: Option<String>,
    payment_status: String,
    paid_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_record(self) -> Result<Payment, StoreError> {
        let key = self.transaction_id.clone();
        let bad = |detail: zap_core::ValidationError| corrupt("payment", &key, detail);
        Ok(Payment {
            transaction_id: TransactionId::new(self.transaction_id).map_err(bad)?,
            tracking_id: TrackingId::parse(&self.tracking_id).map_err(bad)?,
            parcel_id: ParcelId::from_uuid(self.parcel_id),
            parcel_name: self.parcel_name,
            amount_minor: self.amount_minor,
            currency: self.currency,
            customer_email: self.customer_email,
            payment_status: self.payment_status,
            paid_at: self.paid_at,
        })
    }
}

#[async_trait]
impl PaymentRepository for PgBackend {
    async fn find_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<Payment>, StoreError> {
        get_by_transaction(&self.pool, transaction_id)
            .await
            .map_err(backend)?
            .map(PaymentRow::into_record)
            .transpose()
    }

    async fn insert_unique(&self, payment: &Payment) -> Result<InsertOutcome<Payment>, StoreError> {
        if let Some(row) = insert_if_absent(&self.pool, payment).await.map_err(backend)? {
            return Ok(InsertOutcome::Inserted(row.into_record()?));
        }
        match self.find_by_transaction(&payment.transaction_id).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(StoreError::Backend(format!(
                "payment {} conflicted but could not be read back",
                payment.transaction_id
            ))),
        }
    }
}
