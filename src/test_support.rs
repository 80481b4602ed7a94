//! Fixtures shared by the unit tests.

use crate::app_state::AppState;
use crate::config::AppConfig;
use crate::db;
use crate::models::users::{NewUser, User, UserRole};
use crate::queries::users::insert_user;
use sqlx::SqliteConnection;
use tempfile::TempDir;

/// Fresh on-disk database in a temporary directory. Keep the `TempDir`
/// alive for as long as the state is used.
pub async fn test_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        database_url: format!("sqlite://{}", dir.path().join("test.db").display()),
        upload_dir: dir.path().join("uploads"),
        max_db_connections: 4,
        bcrypt_cost: 4,
        ..AppConfig::default()
    };
    let pool = db::connect_to_db(&config).await.expect("connect");
    db::run_migrations(&pool).await.expect("migrate");
    (AppState::new(pool, config), dir)
}

pub async fn create_user(conn: &mut SqliteConnection, name: &str, phone: &str) -> User {
    let username = name.to_lowercase().replace(' ', "");
    insert_user(
        conn,
        &NewUser {
            name: name.to_string(),
            phone: phone.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            email_id: format!("{username}@Mailgram.com"),
            username,
            role: UserRole::Member,
        },
    )
    .await
    .expect("insert user")
}
