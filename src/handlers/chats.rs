use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::app_state::AppState;
use crate::conversations::{fetch_direct_history, fetch_group_history};
use crate::error::{AppError, AppResult};
use crate::membership::gate::{can_access, can_administer, Conversation};
use crate::middlewares::auth::Actor;
use crate::queries::{
    groups::{get_group_by_public_id, list_approved_members},
    messages::mark_direct_read,
    users::get_user_by_id,
};
use crate::utils::flash;

pub async fn direct_chat(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(other_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let other_user = get_user_by_id(&mut conn, other_id).await?;

    let conversation = Conversation::Direct {
        sender_id: user.id,
        receiver_id: other_user.id,
    };
    if !can_access(&mut conn, &user, conversation).await? {
        return Err(AppError::Forbidden(anyhow!("This conversation is not available")));
    }

    let messages = fetch_direct_history(&mut conn, user.id, other_user.id).await?;
    let marked = mark_direct_read(&mut conn, user.id, other_user.id).await?;
    if marked > 0 {
        tracing::debug!(user_id = user.id, peer = other_user.id, marked, "Marked messages read");
    }

    let online = state.channels.is_online(other_user.id).await;
    let flashes = flash::take(&session).await?;

    Ok(Json(json!({
        "user": user,
        "other_user": other_user,
        "online": online,
        "messages": messages,
        "flashes": flashes,
    })))
}

pub async fn group_chat(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(group_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let group = get_group_by_public_id(&mut conn, &group_id).await?;

    let messages = fetch_group_history(&mut conn, &user, &group).await?;
    let members = list_approved_members(&mut conn, group.id).await?;
    let is_admin = can_administer(&user, &group);
    let flashes = flash::take(&session).await?;

    Ok(Json(json!({
        "user": user,
        "group": group,
        "members": members,
        "messages": messages,
        "is_admin": is_admin,
        "flashes": flashes,
    })))
}
