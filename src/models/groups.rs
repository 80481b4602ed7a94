use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a membership row. Moves forward only:
/// `Pending -> Approved` or `Pending -> Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Opaque identifier used in URLs and realtime events.
    pub group_id: String,
    pub creator_id: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GroupMember {
    pub id: i64,
    pub group_id: i64,
    pub user_id: i64,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
}

/// A pending membership row joined with the requesting user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JoinRequest {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub username: String,
    pub requested_at: DateTime<Utc>,
}
