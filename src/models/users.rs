use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserRole {
    Member,
    Admin,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub username: String,
    pub email_id: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// Capability check for the moderation surface.
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Everything needed to insert a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub password_hash: String,
    pub username: String,
    pub email_id: String,
    pub role: UserRole,
}
