//! Tracking event persistence. Events are immutable; the only write is the
//! deduplicating append, serialized per tracking id with a transaction-scoped
//! advisory lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use zap_core::TrackingId;
use zap_dispatch::repository::{InsertOutcome, TrackingRepository};
use zap_dispatch::{StoreError, TrackingEvent};
use zap_state::DeliveryStatus;

use super::{backend, corrupt, PgBackend};

const COLUMNS: &str = "seq, tracking_id, status, details, created_at";

/// Append unless the newest stored event already carries `status`.
///
/// The advisory lock makes the read of the newest event and the insert
/// atomic with respect to other appends for the same tracking id.
pub async fn append_if_changed(
    pool: &PgPool,
    tracking_id: &TrackingId,
    status: DeliveryStatus,
    details: &str,
    at: DateTime<Utc>,
) -> Result<(TrackingEventRow, bool), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(tracking_id.as_str())
        .execute(&mut *tx)
        .await?;

    let latest_sql = format!(
        "SELECT {COLUMNS} FROM tracking_events WHERE tracking_id = $1 ORDER BY seq DESC LIMIT 1"
    );
    let latest = sqlx::query_as::<_, TrackingEventRow>(&latest_sql)
        .bind(tracking_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

    if let Some(latest) = latest.filter(|row| row.status == status.as_str()) {
        tx.commit().await?;
        return Ok((latest, false));
    }

    let insert_sql = format!(
        "INSERT INTO tracking_events (tracking_id, status, details, created_at)
         VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, TrackingEventRow>(&insert_sql)
        .bind(tracking_id.as_str())
        .bind(status.as_str())
        .bind(details)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((row, true))
}

pub async fn list_by_tracking_id(
    pool: &PgPool,
    tracking_id: &TrackingId,
) -> Result<Vec<TrackingEventRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {COLUMNS} FROM tracking_events WHERE tracking_id = $1 ORDER BY seq"
    );
    let rows = sqlx::query_as::<_, TrackingEventRow>(&sql)
        .bind(tracking_id.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

#[derive(sqlx::FromRow)]
pub struct TrackingEventRow {
    seq: i64,
    tracking_id: String,
    status: String,
    details: String,
    created_at: DateTime<Utc>,
}

impl TrackingEventRow {
    pub fn into_record(self) -> Result<TrackingEvent, StoreError> {
        let seq = self.seq;
        Ok(TrackingEvent {
            tracking_id: TrackingId::parse(&self.tracking_id)
                .map_err(|e| corrupt("tracking event", seq, e))?,
            status: self
                .status
                .parse()
                .map_err(|e: zap_state::TransitionError| corrupt("tracking event", seq, e))?,
            details: self.details,
            created_at: self.created_at,
            seq,
        })
    }
}

#[async_trait]
impl TrackingRepository for PgBackend {
    async fn append_if_changed(
        &self,
        tracking_id: &TrackingId,
        status: DeliveryStatus,
        details: &str,
        at: DateTime<Utc>,
    ) -> Result<InsertOutcome<TrackingEvent>, StoreError> {
        let (row, inserted) = append_if_changed(&self.pool, tracking_id, status, details, at)
            .await
            .map_err(backend)?;
        let event = row.into_record()?;
        Ok(if inserted {
            InsertOutcome::Inserted(event)
        } else {
            InsertOutcome::Existing(event)
        })
    }

    async fn history(&self, tracking_id: &TrackingId) -> Result<Vec<TrackingEvent>, StoreError> {
        list_by_tracking_id(&self.pool, tracking_id)
            .await
            .map_err(backend)?
            .into_iter()
            .map(TrackingEventRow::into_record)
            .collect()
    }
}
