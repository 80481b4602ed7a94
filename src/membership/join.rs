//! Approval-gated joining: `no row -> pending -> approved | rejected`.

use anyhow::anyhow;
use sqlx::SqliteConnection;
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::membership::gate::ensure_group_admin;
use crate::models::groups::{Group, GroupMember, MembershipStatus};
use crate::models::users::User;
use crate::queries::groups::{
    decide_pending_membership, find_group_by_id, find_membership, find_membership_by_id,
    insert_pending_member_if_absent,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new pending request was recorded.
    Requested,
    AlreadyPending,
    AlreadyMember,
    /// A previous request was rejected; re-requesting is not possible.
    Rejected,
}

pub async fn request_join(
    conn: &mut SqliteConnection,
    user: &User,
    group: &Group,
) -> AppResult<JoinOutcome> {
    if insert_pending_member_if_absent(conn, group.id, user.id).await? {
        tracing::info!(group = %group.group_id, user_id = user.id, "Join request created");
        return Ok(JoinOutcome::Requested);
    }

    let existing = find_membership(conn, group.id, user.id)
        .await?
        .ok_or_else(|| AppError::InternalServerError(anyhow!("Membership row vanished")))?;

    Ok(match existing.status {
        MembershipStatus::Pending => JoinOutcome::AlreadyPending,
        MembershipStatus::Approved => JoinOutcome::AlreadyMember,
        MembershipStatus::Rejected => JoinOutcome::Rejected,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn target_status(self) -> MembershipStatus {
        match self {
            Decision::Approve => MembershipStatus::Approved,
            Decision::Reject => MembershipStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            other => Err(AppError::BadRequest(anyhow!("Unknown action: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    Applied(GroupMember),
    /// The row had already left `pending`; its status is unchanged.
    AlreadyDecided(MembershipStatus),
}

/// Approve or reject a pending request. Only the group creator may decide.
///
/// Decided rows never move again: deciding an `approved` or `rejected` row
/// is a no-op reported as [`DecisionOutcome::AlreadyDecided`].
pub async fn decide(
    conn: &mut SqliteConnection,
    admin: &User,
    request_id: i64,
    decision: Decision,
) -> AppResult<(Group, DecisionOutcome)> {
    let request = find_membership_by_id(conn, request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Membership request {} not found", request_id)))?;

    let group = find_group_by_id(conn, request.group_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Group not found")))?;

    ensure_group_admin(admin, &group)?;

    if !decide_pending_membership(conn, request.id, decision.target_status()).await? {
        let current = find_membership_by_id(conn, request.id)
            .await?
            .map(|m| m.status)
            .unwrap_or(request.status);
        return Ok((group, DecisionOutcome::AlreadyDecided(current)));
    }

    let updated = GroupMember {
        status: decision.target_status(),
        ..request
    };
    tracing::info!(
        group = %group.group_id,
        user_id = updated.user_id,
        status = ?updated.status,
        "Join request decided"
    );
    Ok((group, DecisionOutcome::Applied(updated)))
}
