//! Rider persistence. `work_status` changes are single-statement updates;
//! reservation is conditional on the rider being approved and available.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use zap_core::{Email, RiderId};
use zap_dispatch::repository::{Conditional, RiderRepository};
use zap_dispatch::{Rider, StoreError};
use zap_state::{RiderApproval, WorkStatus};

use super::{backend, corrupt, store_error, PgBackend};

const COLUMNS: &str = "id, name, email, district, status, work_status, created_at";

pub async fn insert(pool: &PgPool, rider: &Rider) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO riders (id, name, email, district, status, work_status, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(*rider.id.as_uuid())
    .bind(&rider.name)
    .bind(rider.email.as_str())
    .bind(&rider.district)
    .bind(rider.status.as_str())
    .bind(rider.work_status.as_str())
    .bind(rider.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_id(pool: &PgPool, id: RiderId) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM riders WHERE id = $1");
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(*id.as_uuid())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn get_by_email(pool: &PgPool, email: &Email) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM riders WHERE email = $1");
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn set_work_status(
    pool: &PgPool,
    id: RiderId,
    status: WorkStatus,
) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!("UPDATE riders SET work_status = $2 WHERE id = $1 RETURNING {COLUMNS}");
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(*id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// `available → in_delivery` for an approved rider. `None` if the rider is
/// unknown, busy, or not approved.
pub async fn reserve(pool: &PgPool, id: RiderId) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!(
        "UPDATE riders SET work_status = $2
         WHERE id = $1 AND status = $3 AND work_status = $4
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(*id.as_uuid())
        .bind(WorkStatus::InDelivery.as_str())
        .bind(RiderApproval::Approved.as_str())
        .bind(WorkStatus::Available.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn set_approval(
    pool: &PgPool,
    id: RiderId,
    approval: RiderApproval,
) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!(
        "UPDATE riders SET status = $2, work_status = $3 WHERE id = $1 RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(*id.as_uuid())
        .bind(approval.as_str())
        .bind(WorkStatus::Available.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Delete a rider unless they are `in_delivery`. Parcel references are
/// nulled by the foreign key.
pub async fn delete_idle(pool: &PgPool, id: RiderId) -> Result<Option<RiderRow>, sqlx::Error> {
    let sql = format!("DELETE FROM riders WHERE id = $1 AND work_status <> $2 RETURNING {COLUMNS}");
    let row = sqlx::query_as::<_, RiderRow>(&sql)
        .bind(*id.as_uuid())
        .bind(WorkStatus::InDelivery.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[derive(sqlx::FromRow)]
pub struct RiderRow {
    id: Uuid,
    name: String,
    email: String,
    district: String,
    status: String,
    work_status: String,
    created_at: DateTime<Utc>,
}

impl RiderRow {
    pub fn into_record(self) -> Result<Rider, StoreError> {
        let id = self.id;
        let bad = |detail: String| corrupt("rider", id, detail);
        Ok(Rider {
            id: RiderId::from_uuid(self.id),
            name: self.name,
            email: Email::new(&self.email).map_err(|e| bad(e.to_string()))?,
            district: self.district,
            status: self.status.parse().map_err(bad)?,
            work_status: self.work_status.parse().map_err(bad)?,
            created_at: self.created_at,
        })
    }
}

fn decode(row: Option<RiderRow>) -> Result<Option<Rider>, StoreError> {
    row.map(RiderRow::into_record).transpose()
}

#[async_trait]
impl RiderRepository for PgBackend {
    async fn insert(&self, rider: &Rider) -> Result<(), StoreError> {
        insert(&self.pool, rider)
            .await
            .map_err(|e| store_error(e, "rider", || rider.email.to_string()))
    }

    async fn get(&self, id: RiderId) -> Result<Option<Rider>, StoreError> {
        decode(get_by_id(&self.pool, id).await.map_err(backend)?)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Rider>, StoreError> {
        decode(get_by_email(&self.pool, email).await.map_err(backend)?)
    }

    async fn set_work_status(
        &self,
        id: RiderId,
        status: WorkStatus,
    ) -> Result<Option<Rider>, StoreError> {
        decode(set_work_status(&self.pool, id, status).await.map_err(backend)?)
    }

    async fn reserve(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError> {
        if let Some(row) = reserve(&self.pool, id).await.map_err(backend)? {
            return Ok(Conditional::Applied(row.into_record()?));
        }
        Ok(match self.get(id).await? {
            Some(current) => Conditional::Rejected(current),
            None => Conditional::Missing,
        })
    }

    async fn set_approval(
        &self,
        id: RiderId,
        approval: RiderApproval,
    ) -> Result<Option<Rider>, StoreError> {
        decode(set_approval(&self.pool, id, approval).await.map_err(backend)?)
    }

    async fn remove_idle(&self, id: RiderId) -> Result<Conditional<Rider>, StoreError> {
        if let Some(row) = delete_idle(&self.pool, id).await.map_err(backend)? {
            return Ok(Conditional::Applied(row.into_record()?));
        }
        Ok(match self.get(id).await? {
            Some(current) => Conditional::Rejected(current),
            None => Conditional::Missing,
        })
    }
}
