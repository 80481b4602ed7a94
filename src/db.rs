use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::config::AppConfig;

pub async fn connect_to_db(config: &AppConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL must be a valid sqlite connection string")?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;
    Ok(pool)
}

/// Create the relational schema. Safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to apply schema statement: {statement}"))?;
    }
    tracing::info!("Database migrations completed");
    Ok(())
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email_id TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL DEFAULT 'member' CHECK (role IN ('member', 'admin')),
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        last_seen TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        contact_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        added_at TEXT NOT NULL,
        UNIQUE (user_id, contact_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        group_id TEXT NOT NULL UNIQUE,
        creator_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        description TEXT,
        created_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS group_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'approved', 'rejected')),
        joined_at TEXT NOT NULL,
        is_admin INTEGER NOT NULL DEFAULT 0,
        UNIQUE (group_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sender_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        receiver_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
        group_id INTEGER REFERENCES groups(id) ON DELETE CASCADE,
        message_type TEXT NOT NULL DEFAULT 'text'
            CHECK (message_type IN ('text', 'image', 'video', 'audio', 'document')),
        content TEXT NOT NULL,
        file_path TEXT,
        timestamp TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        CHECK ((receiver_id IS NULL) <> (group_id IS NULL))
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        reporter_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        reported_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        reason TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'reviewed', 'resolved'))
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_direct ON messages (sender_id, receiver_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_group ON messages (group_id)",
    "CREATE INDEX IF NOT EXISTS idx_group_members_status ON group_members (group_id, status)",
];
