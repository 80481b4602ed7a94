use crate::error::{AppError, AppResult};
use crate::models::users::{NewUser, User, UserRole};
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

pub async fn insert_user(conn: &mut SqliteConnection, new_user: &NewUser) -> AppResult<User> {
    let now = Utc::now();
    let insert_user_result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, phone, password_hash, username, email_id, role, is_active, created_at, last_seen)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, TRUE, ?7, ?7)
        RETURNING *
        "#,
    )
    .bind(&new_user.name)
    .bind(&new_user.phone)
    .bind(&new_user.password_hash)
    .bind(&new_user.username)
    .bind(&new_user.email_id)
    .bind(new_user.role)
    .bind(now)
    .fetch_one(conn)
    .await;

    match insert_user_result {
        Ok(user) => Ok(user),
        Err(e) if AppError::is_unique_violation(&e) => Err(AppError::BadRequest(anyhow!(
            "Phone number or username is already registered"
        ))),
        Err(e) => Err(AppError::database(e, "Failed to create user account")),
    }
}

pub async fn find_user_by_id(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching user"))
}

/// Like [`find_user_by_id`] but a missing row is a `NotFound` error.
pub async fn get_user_by_id(conn: &mut SqliteConnection, user_id: i64) -> AppResult<User> {
    find_user_by_id(conn, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User {} not found", user_id)))
}

pub async fn find_user_by_phone(conn: &mut SqliteConnection, phone: &str) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = ?1")
        .bind(phone)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching user by phone"))
}

pub async fn find_active_user_by_email_id(
    conn: &mut SqliteConnection,
    email_id: &str,
) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email_id = ?1 AND is_active = TRUE")
        .bind(email_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching user by email id"))
}

pub async fn find_first_admin(conn: &mut SqliteConnection) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ?1 ORDER BY id LIMIT 1")
        .bind(UserRole::Admin)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching administrator"))
}

pub async fn username_exists(conn: &mut SqliteConnection, username: &str) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")
        .bind(username)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error checking username"))?;
    Ok(exists)
}

pub async fn list_users(conn: &mut SqliteConnection) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error listing users"))
}

/// The people directory shown on the dashboard: every other active user.
pub async fn list_other_active_users(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id <> ?1 AND is_active = TRUE AND role = ?2 ORDER BY name, id",
    )
    .bind(user_id)
    .bind(UserRole::Member)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing users"))
}

pub async fn touch_last_seen(
    conn: &mut SqliteConnection,
    user_id: i64,
    at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query("UPDATE users SET last_seen = ?1 WHERE id = ?2")
        .bind(at)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error updating last seen"))?;
    Ok(())
}

pub async fn set_user_active(
    conn: &mut SqliteConnection,
    user_id: i64,
    is_active: bool,
) -> AppResult<()> {
    sqlx::query("UPDATE users SET is_active = ?1 WHERE id = ?2")
        .bind(is_active)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error updating user status"))?;
    Ok(())
}

/// Hard delete. Contacts, memberships, messages, reports and groups
/// owned by the user go with it through `ON DELETE CASCADE`.
pub async fn delete_user(conn: &mut SqliteConnection, user_id: i64) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?1")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error deleting user"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(anyhow!("User {} not found", user_id)));
    }
    Ok(())
}

pub async fn count_users(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting users"))
}

pub async fn count_active_users(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = TRUE")
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting users"))
}
