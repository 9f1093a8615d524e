//! User persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use zap_core::Email;
use zap_dispatch::repository::{InsertOutcome, UserRepository};
use zap_dispatch::{Role, StoreError, User};

use super::{backend, corrupt, PgBackend};

const COLUMNS: &str = "email, display_name, role, created_at";

pub async fn insert_if_absent(pool: &PgPool, user: &User) -> Result<Option<UserRow>, sqlx::Error> {
    let sql = format!(
        "INSERT INTO users (email, display_name, role, created_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO NOTHING
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(user.email.as_str())
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn get_by_email(pool: &PgPool, email: &Email) -> Result<Option<UserRow>, sqlx::Error> {
    let sql = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(email.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn update_role(
    pool: &PgPool,
    email: &Email,
    role: Role,
) -> Result<Option<UserRow>, sqlx::Error> {
    let sql = format!("UPDATE users SET role = $2 WHERE email = $1 RETURNING {COLUMNS}");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(email.as_str())
        .bind(role.as_str())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

#[derive(sqlx::FromRow)]
pub struct UserRow {
    email: String,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_record(self) -> Result<User, StoreError> {
        let email = Email::new(&self.email).map_err(|e| corrupt("user", &self.email, e))?;
        let role = self.role.parse().map_err(|e| corrupt("user", &self.email, e))?;
        Ok(User {
            email,
            display_name: self.display_name,
            role,
            created_at: self.created_at,
        })
    }
}

fn decode(row: Option<UserRow>) -> Result<Option<User>, StoreError> {
    row.map(UserRow::into_record).transpose()
}

#[async_trait]
impl UserRepository for PgBackend {
    async fn insert_if_absent(&self, user: &User) -> Result<InsertOutcome<User>, StoreError> {
        if let Some(row) = insert_if_absent(&self.pool, user).await.map_err(backend)? {
            return Ok(InsertOutcome::Inserted(row.into_record()?));
        }
        match self.get(&user.email).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(StoreError::Backend(format!(
                "user {} conflicted but could not be read back",
                user.email
            ))),
        }
    }

    async fn get(&self, email: &Email) -> Result<Option<User>, StoreError> {
        decode(get_by_email(&self.pool, email).await.map_err(backend)?)
    }

    async fn set_role(&self, email: &Email, role: Role) -> Result<Option<User>, StoreError> {
        decode(update_role(&self.pool, email, role).await.map_err(backend)?)
    }
}
