use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user or an admin account. Which one is decided by the table it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Store-level change set; the secret has already been hashed
#[derive(Debug, Clone, Default)]
pub struct PrincipalUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

impl PrincipalUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none()
    }
}
