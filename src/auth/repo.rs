use async_trait::async_trait;

use crate::auth::repo_types::{NewUser, User};
use crate::db::{is_unique_violation, PgStore};
use crate::error::StoreError;
use crate::ids::RecordId;

const USER_COLUMNS: &str = "id, name, email, password_hash, external_id, created_at";

/// Persistent collection of users, unique by lowercased email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;

    /// Set `external_id` if it is still unset. Repeating the call is a no-op.
    async fn link_external_id(
        &self,
        id: &RecordId,
        external_id: &str,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = new.into_user();
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, external_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.external_id)
        .bind(user.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn link_external_id(
        &self,
        id: &RecordId,
        external_id: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET external_id = COALESCE(external_id, $2)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(external_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(user)
    }
}
