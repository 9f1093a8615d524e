//! Parcel persistence. All writes after the initial insert are
//! compare-and-set updates guarded on delivery status and assigned rider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zap_core::{Email, ParcelId, RiderId, TrackingId};
use zap_dispatch::records::{ParcelChange, ParcelGuard};
use zap_dispatch::repository::{Conditional, ParcelRepository};
use zap_dispatch::{Parcel, StoreError};

use super::{backend, corrupt, PgBackend};

const COLUMNS: &str = "id, tracking_id, delivery_status, payment_status, sender_email, \
     sender_name, parcel_name, cost, details, rider_id, rider_name, rider_email, \
     created_at, updated_at";

pub async fn insert(pool: &PgPool, parcel: &Parcel) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO parcels (id, tracking_id, delivery_status, payment_status, sender_email,
         sender_name, parcel_name, cost, details, rider_id, rider_name, rider_email,
         created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(*parcel.id.as_uuid())
    .bind(parcel.tracking_id.as_str())
    .bind(parcel.delivery_status.as_str())
    .bind(parcel.payment_status.as_str())
    .bind(parcel.sender_email.as_str())
    .bind(&parcel.sender_name)
    .bind(&parcel.parcel_name)
    .bind(parcel.cost)
    .bind(&parcel.details)
    .bind(parcel.rider_id.map(|id| *id.as_uuid()))
    .bind(&parcel.rider_name)
    .bind(parcel.rider_email.as_ref().map(Email::as_str))
    .bind(parcel.created_at)
    .bind(parcel.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_id(pool: &PgPool, id: ParcelId) -> Result<Option<ParcelRow>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM parcels WHERE id = $1");
    let row = sqlx::query_as::<_, ParcelRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Apply `change` only where the stored row still matches `expected`.
/// `None` means the guard did not hold or the row does not exist.
pub async fn update_guarded(
    pool: &PgPool,
    id: ParcelId,
    expected: ParcelGuard,
    change: &ParcelChange,
    at: DateTime<Utc>,
) -> Result<Option<ParcelRow>, sqlx::Error> {
    let rider = change.rider.as_ref();
    let sql = format!(
        "UPDATE parcels SET delivery_status = $4, payment_status = $5, rider_id = $6,
         rider_name = $7, rider_email = $8, updated_at = $9
         WHERE id = $1 AND delivery_status = $2 AND rider_id IS NOT DISTINCT FROM $3
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ParcelRow>(&sql)
        .bind(*id.as_uuid())
        .bind(expected.delivery_status.as_str())
        .bind(expected.rider_id.map(|r| *r.as_uuid()))
        .bind(change.delivery_status.as_str())
        .bind(change.payment_status.as_str())
        .bind(rider.map(|r| *r.id.as_uuid()))
        .bind(rider.map(|r| r.name.clone()))
        .bind(rider.and_then(|r| r.email.as_ref()).map(|e| e.as_str().to_string()))
        .bind(at)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Delete only where the stored row still matches `expected`.
pub async fn delete_guarded(
    pool: &PgPool,
    id: ParcelId,
    expected: ParcelGuard,
) -> Result<Option<ParcelRow>, sqlx::Error> {
    let sql = format!(
        "DELETE FROM parcels
         WHERE id = $1 AND delivery_status = $2 AND rider_id IS NOT DISTINCT FROM $3
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, ParcelRow>(&sql)
        .bind(*id.as_uuid())
        .bind(expected.delivery_status.as_str())
        .bind(expected.rider_id.map(|r| *r.as_uuid()))
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[derive(sqlx::FromRow)]
pub struct ParcelRow {
    id: Uuid,
    tracking_id: String,
    delivery_status: String,
    payment_status: String,
    sender_email: String,
    sender_name: String,
    parcel_name: String,
    cost: i64,
    details: serde_json::Value,
    rider_id: Option<Uuid>,
    rider_name: Option<String>,
    rider_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ParcelRow {
    pub fn into_record(self) -> Result<Parcel, StoreError> {
        let id = self.id;
        let bad = |detail: String| corrupt("parcel", id, detail);
        Ok(Parcel {
            id: ParcelId::from_uuid(self.id),
            tracking_id: TrackingId::parse(&self.tracking_id).map_err(|e| bad(e.to_string()))?,
            delivery_status: self
                .delivery_status
                .parse()
                .map_err(|e: zap_state::TransitionError| bad(e.to_string()))?,
            payment_status: self.payment_status.parse().map_err(bad)?,
            sender_email: Email::new(&self.sender_email).map_err(|e| bad(e.to_string()))?,
            sender_name: self.sender_name,
            parcel_name: self.parcel_name,
            cost: self.cost,
            details: self.details,
            rider_id: self.rider_id.map(RiderId::from_uuid),
            rider_name: self.rider_name,
            rider_email: self
                .rider_email
                .map(|e| Email::new(e).map_err(|e| bad(e.to_string())))
                .transpose()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ParcelRepository for PgBackend {
    async fn insert(&self, parcel: &Parcel) -> Result<(), StoreError> {
        insert(&self.pool, parcel).await.map_err(|err| {
            let tracking_clash = err
                .as_database_error()
                .filter(|db| db.is_unique_violation())
                .and_then(|db| db.constraint())
                == Some("parcels_tracking_id_key");
            if tracking_clash {
                StoreError::Duplicate {
                    kind: "tracking id",
                    key: parcel.tracking_id.to_string(),
                }
            } else {
                super::store_error(err, "parcel", || parcel.id.to_string())
            }
        })
    }

    async fn get(&self, id: ParcelId) -> Result<Option<Parcel>, StoreError> {
        get_by_id(&self.pool, id)
            .await
            .map_err(backend)?
            .map(ParcelRow::into_record)
            .transpose()
    }

    async fn compare_and_set(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
        change: &ParcelChange,
        at: DateTime<Utc>,
    ) -> Result<Conditional<Parcel>, StoreError> {
        if let Some(row) = update_guarded(&self.pool, id, expected, change, at)
            .await
            .map_err(backend)?
        {
            return Ok(Conditional::Applied(row.into_record()?));
        }
        Ok(match self.get(id).await? {
            Some(current) => Conditional::Rejected(current),
            None => Conditional::Missing,
        })
    }

    async fn delete_guarded(
        &self,
        id: ParcelId,
        expected: ParcelGuard,
    ) -> Result<Conditional<Parcel>, StoreError> {
        if let Some(row) = delete_guarded(&self.pool, id, expected)
            .await
            .map_err(backend)?
        {
            return Ok(Conditional::Applied(row.into_record()?));
        }
        Ok(match self.get(id).await? {
            Some(current) => Conditional::Rejected(current),
            None => Conditional::Missing,
        })
    }
}
