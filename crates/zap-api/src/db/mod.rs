//! # Database Persistence Layer
//!
//! Postgres implementations of the `zap_dispatch` repository traits via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set the service
//! persists to PostgreSQL; when absent it runs on
//! [`zap_dispatch::memory::MemoryBackend`] and state does not survive a
//! restart.
//!
//! Each conditional write of the repository traits is a single statement or
//! a single transaction:
//!
//! | Operation | Mechanism |
//! |---|---|
//! | tracking `append_if_changed` | `pg_advisory_xact_lock` per tracking id |
//! | payment `insert_unique` | `ON CONFLICT (transaction_id) DO NOTHING` |
//! | parcel `compare_and_set` | `UPDATE ... WHERE delivery_status = $ AND rider_id IS NOT DISTINCT FROM $` |
//! | rider `reserve` | `UPDATE ... WHERE status = 'approved' AND work_status = 'available'` |
//! | parcel `delete_guarded` | `DELETE ... WHERE delivery_status = $ AND rider_id IS NOT DISTINCT FROM $` |
//! | rider `remove_idle` | `DELETE ... WHERE work_status <> 'in_delivery'` |

pub mod parcels;
pub mod payments;
pub mod riders;
pub mod trackings;
pub mod users;

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};
use zap_dispatch::{Repositories, StoreError};

/// Initialize the connection pool and run migrations.
///
/// Returns `None` when no URL is configured (in-memory mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, running on in-memory storage. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Repository backend over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn into_repositories(self) -> Repositories {
        let backend = Arc::new(self);
        Repositories {
            parcels: backend.clone(),
            riders: backend.clone(),
            trackings: backend.clone(),
            payments: backend.clone(),
            users: backend,
        }
    }
}

/// Map a driver error, turning unique violations into [`StoreError::Duplicate`].
pub(crate) fn store_error(err: sqlx::Error, kind: &'static str, key: impl FnOnce() -> String) -> StoreError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return StoreError::Duplicate { kind, key: key() };
        }
    }
    backend(err)
}

pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// A stored column that no longer decodes into its domain type.
pub(crate) fn corrupt(kind: &'static str, id: impl std::fmt::Display, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        kind,
        id: id.to_string(),
        detail: detail.to_string(),
    }
}
