use crate::error::{AppError, AppResult};
use crate::models::users::User;
use chrono::Utc;
use sqlx::SqliteConnection;

/// Add `contact_id` to `user_id`'s contact list.
///
/// Returns `false` when the edge already existed. Edges are directional;
/// the reverse edge is never created here.
pub async fn insert_contact_if_absent(
    conn: &mut SqliteConnection,
    user_id: i64,
    contact_id: i64,
) -> AppResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO contacts (user_id, contact_id, added_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (user_id, contact_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(contact_id)
    .bind(Utc::now())
    .execute(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to add contact"))?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_contacts(conn: &mut SqliteConnection, user_id: i64) -> AppResult<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM contacts c
        JOIN users u ON u.id = c.contact_id
        WHERE c.user_id = ?1 AND u.is_active = TRUE
        ORDER BY c.added_at, c.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error listing contacts"))
}
