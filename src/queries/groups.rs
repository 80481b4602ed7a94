use crate::error::{AppError, AppResult};
use crate::models::groups::{Group, GroupMember, JoinRequest, MembershipStatus};
use crate::models::users::User;
use anyhow::anyhow;
use chrono::Utc;
use sqlx::SqliteConnection;

pub async fn insert_group(
    conn: &mut SqliteConnection,
    name: &str,
    public_id: &str,
    creator_id: i64,
    description: Option<&str>,
) -> AppResult<Group> {
    sqlx::query_as::<_, Group>(
        r#"
        INSERT INTO groups (name, group_id, creator_id, description, created_at, is_active)
        VALUES (?1, ?2, ?3, ?4, ?5, TRUE)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(public_id)
    .bind(creator_id)
    .bind(description)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to create group"))
}

pub async fn find_group_by_id(conn: &mut SqliteConnection, id: i64) -> AppResult<Option<Group>> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching group"))
}

pub async fn find_group_by_public_id(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> AppResult<Option<Group>> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE group_id = ?1")
        .bind(public_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching group"))
}

/// Like [`find_group_by_public_id`] but a missing group is a `NotFound` error.
pub async fn get_group_by_public_id(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> AppResult<Group> {
    find_group_by_public_id(conn, public_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("Group {} not found", public_id)))
}

pub async fn insert_member(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
    status: MembershipStatus,
    is_admin: bool,
) -> AppResult<GroupMember> {
    sqlx::query_as::<_, GroupMember>(
        r#"
        INSERT INTO group_members (group_id, user_id, status, joined_at, is_admin)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(status)
    .bind(Utc::now())
    .bind(is_admin)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to create group membership"))
}

/// Create a `pending` row unless one already exists for (group, user).
///
/// Returns `true` when a row was created. Concurrent requests for the same
/// pair collapse onto the `UNIQUE (group_id, user_id)` constraint.
pub async fn insert_pending_member_if_absent(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO group_members (group_id, user_id, status, joined_at, is_admin)
        VALUES (?1, ?2, ?3, ?4, FALSE)
        ON CONFLICT (group_id, user_id) DO NOTHING
        "#,
    )
    .bind(group_id)
    .bind(user_id)
    .bind(MembershipStatus::Pending)
    .bind(Utc::now())
    .execute(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to create membership request"))?;

    Ok(result.rows_affected() == 1)
}

pub async fn find_membership(
    conn: &mut SqliteConnection,
    group_id: i64,
    user_id: i64,
) -> AppResult<Option<GroupMember>> {
    sqlx::query_as::<_, GroupMember>(
        "SELECT * FROM group_members WHERE group_id = ?1 AND user_id = ?2",
    )
    .bind(group_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error fetching membership"))
}

pub async fn find_membership_by_id(
    conn: &mut SqliteConnection,
    membership_id: i64,
) -> AppResult<Option<GroupMember>> {
    sqlx::query_as::<_, GroupMember>("SELECT * FROM group_members WHERE id = ?1")
        .bind(membership_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching membership"))
}

/// Move a `pending` row to `status`. Rows that already left `pending` are
/// left untouched; returns whether the row changed.
pub async fn decide_pending_membership(
    conn: &mut SqliteConnection,
    membership_id: i64,
    status: MembershipStatus,
) -> AppResult<bool> {
    let result = sqlx::query("UPDATE group_members SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(status)
        .bind(membership_id)
        .bind(MembershipStatus::Pending)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(e, "Failed to update membership request"))?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_pending_requests(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> AppResult<Vec<JoinRequest>> {
    sqlx::query_as::<_, JoinRequest>(
        r#"
        SELECT gm.id, gm.user_id, u.name, u.username, gm.joined_at AS requested_at
        FROM group_members gm
        JOIN users u ON u.id = gm.user_id
        WHERE gm.group_id = ?1 AND gm.status = ?2
        ORDER BY gm.joined_at, gm.id
        "#,
    )
    .bind(group_id)
    .bind(MembershipStatus::Pending)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing membership requests"))
}

/// Active users holding an `approved` row for the group: the fan-out set.
pub async fn list_approved_member_ids(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> AppResult<Vec<i64>> {
    sqlx::query_scalar(
        r#"
        SELECT gm.user_id FROM group_members gm
        JOIN users u ON u.id = gm.user_id
        WHERE gm.group_id = ?1 AND gm.status = ?2 AND u.is_active = TRUE
        ORDER BY gm.id
        "#,
    )
    .bind(group_id)
    .bind(MembershipStatus::Approved)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing group members"))
}

pub async fn list_approved_members(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM group_members gm
        JOIN users u ON u.id = gm.user_id
        WHERE gm.group_id = ?1 AND gm.status = ?2
        ORDER BY gm.id
        "#,
    )
    .bind(group_id)
    .bind(MembershipStatus::Approved)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing group members"))
}

/// Groups in which the user holds an `approved` membership.
pub async fn list_groups_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> AppResult<Vec<Group>> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.* FROM groups g
        JOIN group_members gm ON gm.group_id = g.id
        WHERE gm.user_id = ?1 AND gm.status = ?2
        ORDER BY g.created_at, g.id
        "#,
    )
    .bind(user_id)
    .bind(MembershipStatus::Approved)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing groups"))
}

pub async fn list_groups(conn: &mut SqliteConnection) -> AppResult<Vec<Group>> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups ORDER BY id")
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error listing groups"))
}

pub async fn count_groups(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM groups")
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting groups"))
}
