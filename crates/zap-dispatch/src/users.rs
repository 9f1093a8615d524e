//! # User Directory
//!
//! Email-keyed user records carrying the authorization role. Unknown emails
//! resolve to [`Role::User`].

use std::sync::Arc;

use chrono::Utc;
use zap_core::Email;

use crate::error::DispatchError;
use crate::records::{Role, User};
use crate::repository::{InsertOutcome, UserRepository};

#[derive(Clone)]
pub struct UserDirectory {
    repo: Arc<dyn UserRepository>,
}

impl UserDirectory {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Create a `user`-role record unless one exists for this email.
    pub async fn register(
        &self,
        email: Email,
        display_name: impl Into<String>,
    ) -> Result<InsertOutcome<User>, DispatchError> {
        let user = User {
            email,
            display_name: display_name.into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        Ok(self.repo.insert_if_absent(&user).await?)
    }

    pub async fn get(&self, email: &Email) -> Result<Option<User>, DispatchError> {
        Ok(self.repo.get(email).await?)
    }

    pub async fn role_of(&self, email: &Email) -> Result<Role, DispatchError> {
        Ok(self
            .repo
            .get(email)
            .await?
            .map(|u| u.role)
            .unwrap_or_default())
    }

    pub async fn set_role(&self, email: &Email, role: Role) -> Result<User, DispatchError> {
        self.repo
            .set_role(email, role)
            .await?
            .ok_or_else(|| DispatchError::NotFound {
                kind: "user",
                id: email.to_string(),
            })
    }

    /// Set the role, creating the user record first if needed.
    pub async fn grant(
        &self,
        email: &Email,
        role: Role,
        display_name: &str,
    ) -> Result<User, DispatchError> {
        let outcome = self.register(email.clone(), display_name).await?;
        if outcome.is_inserted() && role == Role::User {
            return Ok(outcome.into_inner());
        }
        self.set_role(email, role).await
    }

    /// Ensure every listed email holds the admin role.
    pub async fn seed_admins(&self, emails: &[Email]) -> Result<(), DispatchError> {
        for email in emails {
            self.grant(email, Role::Admin, email.as_str()).await?;
            tracing::info!(email = %email, "admin role seeded");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(MemoryBackend::new()))
    }

    fn email(s: &str) -> Email {
        Email::new(s).unwrap()
    }

    #[tokio::test]
    async fn register_is_idempotent_and_keeps_role() {
        let users = directory();
        assert!(users.register(email("a@example.com"), "A").await.unwrap().is_inserted());
        users.set_role(&email("a@example.com"), Role::Admin).await.unwrap();

        let again = users.register(email("a@example.com"), "Other").await.unwrap();
        assert!(!again.is_inserted());
        let user = again.into_inner();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.display_name, "A");
    }

    #[tokio::test]
    async fn unknown_email_is_plain_user() {
        assert_eq!(directory().role_of(&email("ghost@example.com")).await.unwrap(), Role::User);
    }

    #[tokio::test]
    async fn set_role_on_unknown_user_is_not_found() {
        let err = directory()
            .set_role(&email("ghost@example.com"), Role::Rider)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { kind: "user", .. }));
    }

    #[tokio::test]
    async fn seed_admins_creates_and_promotes() {
        let users = directory();
        users.register(email("ops@example.com"), "Ops").await.unwrap();
        users
            .seed_admins(&[email("ops@example.com"), email("root@example.com")])
            .await
            .unwrap();
        assert_eq!(users.role_of(&email("ops@example.com")).await.unwrap(), Role::Admin);
        assert_eq!(users.role_of(&email("root@example.com")).await.unwrap(), Role::Admin);
    }
}
