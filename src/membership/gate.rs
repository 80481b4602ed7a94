//! Authorization predicates over the current store state.
//!
//! Nothing here mutates; callers pass the acting user explicitly.

use anyhow::anyhow;
use sqlx::SqliteConnection;

use crate::error::{AppError, AppResult};
use crate::models::groups::{Group, MembershipStatus};
use crate::models::users::User;
use crate::queries::groups::find_membership;
use crate::queries::users::find_user_by_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversation {
    /// One-to-one conversation between two users.
    Direct { sender_id: i64, receiver_id: i64 },
    /// Conversation of a group, by its internal key.
    Group { group_id: i64 },
}

/// Whether `actor` may read and write `conversation`.
///
/// Direct conversations are open between any two active users as long as
/// the actor is one of them; there is no contact-list check. Group
/// conversations need an `approved` membership row for the actor.
pub async fn can_access(
    conn: &mut SqliteConnection,
    actor: &User,
    conversation: Conversation,
) -> AppResult<bool> {
    if !actor.is_active {
        return Ok(false);
    }

    match conversation {
        Conversation::Direct {
            sender_id,
            receiver_id,
        } => {
            let peer_id = if actor.id == sender_id {
                receiver_id
            } else if actor.id == receiver_id {
                sender_id
            } else {
                return Ok(false);
            };
            if peer_id == actor.id {
                return Ok(true);
            }
            let peer = find_user_by_id(conn, peer_id).await?;
            Ok(peer.map(|p| p.is_active).unwrap_or(false))
        }
        Conversation::Group { group_id } => {
            let membership = find_membership(conn, group_id, actor.id).await?;
            Ok(matches!(
                membership.map(|m| m.status),
                Some(MembershipStatus::Approved)
            ))
        }
    }
}

/// `Forbidden` unless [`can_access`] passes for the group.
pub async fn ensure_group_access(
    conn: &mut SqliteConnection,
    actor: &User,
    group: &Group,
) -> AppResult<()> {
    if can_access(conn, actor, Conversation::Group { group_id: group.id }).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow!(
            "You are not a member of this group"
        )))
    }
}

/// Group administration (reviewing join requests) belongs to the creator
/// alone. The per-row `is_admin` flag is informational only.
pub fn can_administer(actor: &User, group: &Group) -> bool {
    actor.is_active && actor.id == group.creator_id
}

pub fn ensure_group_admin(actor: &User, group: &Group) -> AppResult<()> {
    if can_administer(actor, group) {
        Ok(())
    } else {
        Err(AppError::Forbidden(anyhow!(
            "You do not have permission to manage this group"
        )))
    }
}
