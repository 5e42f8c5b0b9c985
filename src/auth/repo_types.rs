use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::ids::RecordId;

/// User record. At least one of `password_hash` / `external_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String, // stored lowercased
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // Argon2 hash, not exposed in JSON
    pub external_id: Option<String>, // identity provider subject
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields supplied at registration or first external login.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: RecordId::generate_at(now),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            external_id: self.external_id,
            created_at: now,
        }
    }
}
