use crate::error::{AppError, AppResult};
use crate::models::users::{NewUser, User, UserRole};
use crate::queries::users::{insert_user, username_exists};
use sqlx::SqliteConnection;

/// Usernames no registration may claim.
const RESERVED_USERNAMES: &[&str] = &["admin"];

/// Deterministic base derived from a display name: lowercased, spaces removed.
pub fn username_base(name: &str) -> String {
    name.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// First free username for `name`: the base itself, then base1, base2, ...
pub async fn generate_unique_username(conn: &mut SqliteConnection, name: &str) -> AppResult<String> {
    let base = username_base(name);
    let mut username = base.clone();
    let mut counter = 1u32;

    while username.is_empty()
        || RESERVED_USERNAMES.contains(&username.as_str())
        || username_exists(conn, &username).await?
    {
        username = format!("{base}{counter}");
        counter += 1;
    }

    Ok(username)
}

pub fn email_alias(username: &str, domain: &str) -> String {
    format!("{username}@{domain}")
}

/// Member fields a registration supplies; username and alias are derived.
pub struct Registration<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub password_hash: &'a str,
    pub email_domain: &'a str,
}

/// Create a member account under the first free username for its name.
pub async fn register_member(
    conn: &mut SqliteConnection,
    registration: &Registration<'_>,
) -> AppResult<User> {
    let username = generate_unique_username(conn, registration.name).await?;
    insert_as(conn, registration, username).await
}

/// A concurrent registration may claim `username` between lookup and
/// insert; the loser picks a fresh name once.
async fn insert_as(
    conn: &mut SqliteConnection,
    registration: &Registration<'_>,
    username: String,
) -> AppResult<User> {
    match insert_user(conn, &new_member(registration, username.clone())).await {
        Err(AppError::BadRequest(e)) => {
            if !username_exists(conn, &username).await? {
                return Err(AppError::BadRequest(e));
            }
            tracing::debug!(username = %username, "Username claimed concurrently, retrying");
            let username = generate_unique_username(conn, registration.name).await?;
            insert_user(conn, &new_member(registration, username)).await
        }
        other => other,
    }
}

fn new_member(registration: &Registration<'_>, username: String) -> NewUser {
    NewUser {
        name: registration.name.to_string(),
        phone: registration.phone.to_string(),
        password_hash: registration.password_hash.to_string(),
        email_id: email_alias(&username, registration.email_domain),
        username,
        role: UserRole::Member,
    }
}
