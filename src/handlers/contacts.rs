use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tower_sessions::Session;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::Actor;
use crate::queries::{contacts::insert_contact_if_absent, users::find_active_user_by_email_id};
use crate::utils::flash::{self, FlashLevel};

pub async fn add_contact(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(email_id): Path<String>,
) -> AppResult<Redirect> {
    let mut conn = state.conn().await?;

    let contact = find_active_user_by_email_id(&mut conn, email_id.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("No user with this address was found")))?;

    if contact.id == user.id {
        return Err(AppError::BadRequest(anyhow!("You cannot add yourself as a contact")));
    }

    if insert_contact_if_absent(&mut conn, user.id, contact.id).await? {
        tracing::debug!(user_id = user.id, contact_id = contact.id, "Contact added");
        flash::push(&session, FlashLevel::Success, "Contact added").await?;
    } else {
        flash::push(&session, FlashLevel::Info, "This user is already in your contacts").await?;
    }

    Ok(Redirect::to("/dashboard"))
}
