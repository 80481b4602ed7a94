use crate::error::{AppError, AppResult};
use crate::models::messages::{Addressing, Message, NewMessage};
use chrono::Utc;
use sqlx::SqliteConnection;

pub async fn insert_message(
    conn: &mut SqliteConnection,
    new_message: &NewMessage,
) -> AppResult<Message> {
    let (receiver_id, group_id) = match new_message.addressing {
        Addressing::Direct { receiver_id } => (Some(receiver_id), None),
        Addressing::Group { group_id } => (None, Some(group_id)),
    };

    sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (sender_id, receiver_id, group_id, message_type, content, file_path, timestamp, is_read)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, FALSE)
        RETURNING *
        "#,
    )
    .bind(new_message.sender_id)
    .bind(receiver_id)
    .bind(group_id)
    .bind(new_message.message_type)
    .bind(&new_message.content)
    .bind(&new_message.file_path)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to store message"))
}

/// Both directions of the conversation between `a` and `b`, oldest first.
pub async fn fetch_direct_history(
    conn: &mut SqliteConnection,
    a: i64,
    b: i64,
) -> AppResult<Vec<Message>> {
    sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE (sender_id = ?1 AND receiver_id = ?2)
           OR (sender_id = ?2 AND receiver_id = ?1)
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error fetching conversation"))
}

pub async fn fetch_group_history(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> AppResult<Vec<Message>> {
    sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE group_id = ?1 ORDER BY timestamp ASC, id ASC",
    )
    .bind(group_id)
    .fetch_all(conn)
    .await
    .map_err(|e| AppError::database(e, "Database error fetching group conversation"))
}

/// Flag every message `sender_id` sent to `reader_id` as read.
pub async fn mark_direct_read(
    conn: &mut SqliteConnection,
    reader_id: i64,
    sender_id: i64,
) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = TRUE WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = FALSE",
    )
    .bind(reader_id)
    .bind(sender_id)
    .execute(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to mark messages as read"))?;

    Ok(result.rows_affected())
}

pub async fn count_unread_direct(conn: &mut SqliteConnection, reader_id: i64) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = FALSE")
        .bind(reader_id)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting unread messages"))
}

pub async fn list_messages(conn: &mut SqliteConnection) -> AppResult<Vec<Message>> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages ORDER BY timestamp ASC, id ASC")
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error listing messages"))
}

pub async fn count_messages(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting messages"))
}
