use chrono::{DateTime, Utc};
use serde::Serialize;

/// Directed edge: `user_id` keeps `contact_id` in their contact list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub contact_id: i64,
    pub added_at: DateTime<Utc>,
}
