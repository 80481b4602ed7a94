use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    fn rank(self) -> u8 {
        match self {
            ReportStatus::Pending => 0,
            ReportStatus::Reviewed => 1,
            ReportStatus::Resolved => 2,
        }
    }

    /// Reports only move forward: pending -> reviewed -> resolved.
    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        next.rank() > self.rank()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub reported_user_id: i64,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub status: ReportStatus,
}
