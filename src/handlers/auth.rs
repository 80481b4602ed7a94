use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::sessions::{UserSession, USER_SESSION_KEY};
use crate::models::users::{NewUser, User, UserRole};
use crate::queries::users::{
    find_first_admin, find_user_by_id, find_user_by_phone, insert_user, touch_last_seen,
};
use crate::utils::flash::{self, FlashLevel};
use crate::utils::identity::{email_alias, register_member, Registration};
use anyhow::anyhow;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use bcrypt::{hash, verify};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqliteConnection;
use std::borrow::Cow;
use subtle::ConstantTimeEq;
use tower_sessions::Session;
use validator::{Validate, ValidationError};

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !digits.is_empty() && digits.len() <= 20 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message(Cow::Borrowed("Phone must be up to 20 digits")))
    }
}

#[derive(Deserialize, Validate)]
pub struct Register {
    #[validate(length(min = 1, max = 100, message = "Name is required and cannot exceed 100 characters"))]
    name: String,

    #[validate(custom(function = "validate_phone"))]
    phone: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

#[derive(Deserialize)]
pub struct Login {
    phone: String,
    password: String,
}

/// Send visitors where their session says they belong.
pub async fn index(State(state): State<AppState>, session: Session) -> AppResult<Redirect> {
    let Some(user_session) = session.get::<UserSession>(USER_SESSION_KEY).await? else {
        return Ok(Redirect::to("/login"));
    };

    let mut conn = state.conn().await?;

    Ok(match find_user_by_id(&mut conn, user_session.user_id).await? {
        Some(user) if user.is_active && user.is_admin() => Redirect::to("/admin"),
        Some(user) if user.is_active => Redirect::to("/dashboard"),
        _ => Redirect::to("/login"),
    })
}

/// Pending status messages for the login and registration forms.
pub async fn auth_page(session: Session) -> AppResult<impl IntoResponse> {
    let flashes = flash::take(&session).await?;
    Ok(Json(serde_json::json!({ "flashes": flashes })))
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(mut payload): Form<Register>,
) -> AppResult<Redirect> {
    payload.name = payload.name.trim().to_string();
    payload.phone = payload.phone.trim().to_string();

    payload.validate()?;

    let mut conn = state.conn().await?;

    if find_user_by_phone(&mut conn, &payload.phone).await?.is_some() {
        return Err(AppError::BadRequest(anyhow!("Phone number is already registered")));
    }

    let password_hash = hash(payload.password.as_bytes(), state.config.bcrypt_cost)
        .map_err(|_| AppError::InternalServerError(anyhow!("Error processing registration")))?;

    let user = register_member(
        &mut conn,
        &Registration {
            name: &payload.name,
            phone: &payload.phone,
            password_hash: &password_hash,
            email_domain: &state.config.email_domain,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    flash::push(
        &session,
        FlashLevel::Success,
        "Registration successful. You can now log in.",
    )
    .await?;
    Ok(Redirect::to("/login"))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(payload): Form<Login>,
) -> AppResult<Redirect> {
    let phone = payload.phone.trim();

    let mut conn = state.conn().await?;

    let login_matches: bool = phone.as_bytes().ct_eq(state.config.admin_login.as_bytes()).into();
    let password_matches: bool = payload
        .password
        .as_bytes()
        .ct_eq(state.config.admin_password.as_bytes())
        .into();

    if login_matches && password_matches {
        let admin = ensure_admin_user(&mut conn, &state).await?;
        start_session(&session, &admin).await?;
        touch_last_seen(&mut conn, admin.id, Utc::now()).await?;
        tracing::info!(user_id = admin.id, "Administrator logged in");
        return Ok(Redirect::to("/admin"));
    }

    let user = find_user_by_phone(&mut conn, phone)
        .await?
        .filter(|user| user.is_active && user.role == UserRole::Member);

    let Some(user) = user else {
        tracing::info!("Login refused for unknown or disabled account");
        return Err(AppError::Unauthorized(anyhow!("Invalid phone number or password")));
    };

    let is_valid = verify(payload.password.as_bytes(), &user.password_hash)
        .map_err(|_| AppError::InternalServerError(anyhow!("Error verifying password")))?;
    if !is_valid {
        tracing::info!(user_id = user.id, "Login refused: wrong password");
        return Err(AppError::Unauthorized(anyhow!("Invalid phone number or password")));
    }

    start_session(&session, &user).await?;
    touch_last_seen(&mut conn, user.id, Utc::now()).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Redirect::to("/dashboard"))
}

pub async fn logout(session: Session) -> AppResult<Redirect> {
    session.flush().await?;
    flash::push(&session, FlashLevel::Success, "You have been logged out.").await?;
    Ok(Redirect::to("/login"))
}

async fn start_session(session: &Session, user: &User) -> AppResult<()> {
    session.cycle_id().await?;
    session
        .insert(USER_SESSION_KEY, UserSession { user_id: user.id })
        .await?;
    Ok(())
}

/// The administrator principal, created on first use.
async fn ensure_admin_user(conn: &mut SqliteConnection, state: &AppState) -> AppResult<User> {
    if let Some(admin) = find_first_admin(conn).await? {
        return Ok(admin);
    }

    let password_hash = hash(state.config.admin_password.as_bytes(), state.config.bcrypt_cost)
        .map_err(|_| AppError::InternalServerError(anyhow!("Error creating administrator")))?;

    let admin = insert_user(
        conn,
        &NewUser {
            name: "Administrator".to_string(),
            phone: state.config.admin_login.clone(),
            password_hash,
            username: "admin".to_string(),
            email_id: email_alias("admin", &state.config.email_domain),
            role: UserRole::Admin,
        },
    )
    .await?;

    tracing::info!(user_id = admin.id, "Created administrator account");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_accepts_digits_with_optional_plus() {
        assert!(validate_phone("09120000001").is_ok());
        assert!(validate_phone("+989120000001").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("+").is_err());
        assert!(validate_phone("0912-000").is_err());
        assert!(validate_phone("123456789012345678901").is_err());
    }

    #[test]
    fn registration_rules() {
        let ok = Register {
            name: "Ali Reza".to_string(),
            phone: "09120000001".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let short_password = Register {
            password: "12345".to_string(),
            ..ok
        };
        assert!(short_password.validate().is_err());
    }
}
