use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::app_state::AppState;
use crate::error::AppResult;
use crate::middlewares::auth::Actor;
use crate::queries::{
    contacts::list_contacts, groups::list_groups_for_user, messages::count_unread_direct,
    users::list_other_active_users,
};
use crate::utils::flash;

pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
) -> AppResult<Response> {
    if user.is_admin() {
        return Ok(Redirect::to("/admin").into_response());
    }

    let mut conn = state.conn().await?;
    let contacts = list_contacts(&mut conn, user.id).await?;
    let users = list_other_active_users(&mut conn, user.id).await?;
    let groups = list_groups_for_user(&mut conn, user.id).await?;
    let unread = count_unread_direct(&mut conn, user.id).await?;
    let flashes = flash::take(&session).await?;

    Ok(Json(json!({
        "user": user,
        "contacts": contacts,
        "users": users,
        "groups": groups,
        "unread_count": unread,
        "flashes": flashes,
    }))
    .into_response())
}
