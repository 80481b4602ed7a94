use serde::{Deserialize, Serialize};

/// Session key under which the authenticated user is stored.
pub const USER_SESSION_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
}
