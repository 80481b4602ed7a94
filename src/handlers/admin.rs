use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Json,
};
use serde::Serialize;
use serde_json::json;
use sqlx::SqliteConnection;
use tower_sessions::Session;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::AdminActor;
use crate::models::reports::ReportStatus;
use crate::models::websocket::Presence;
use crate::queries::{
    groups::{count_groups, list_groups},
    messages::{count_messages, list_messages},
    reports::{count_pending_reports, get_report_by_id, list_reports, update_report_status},
    users::{
        count_active_users, count_users, delete_user as remove_user, get_user_by_id, list_users,
        set_user_active,
    },
};
use crate::utils::flash::{self, FlashLevel};
use crate::websocket::fanout::announce_presence;

/// Close the user's live sockets so no further fan-out reaches them.
async fn disconnect_user(state: &AppState, user_id: i64) {
    if state.channels.unbind_user(user_id).await > 0 {
        announce_presence(&state.channels, user_id, Presence::Offline, None).await;
    }
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total_users: i64,
    pub total_groups: i64,
    pub total_messages: i64,
    pub pending_reports: i64,
    pub active_users: i64,
}

async fn collect_stats(conn: &mut SqliteConnection) -> AppResult<Stats> {
    Ok(Stats {
        total_users: count_users(conn).await?,
        total_groups: count_groups(conn).await?,
        total_messages: count_messages(conn).await?,
        pending_reports: count_pending_reports(conn).await?,
        active_users: count_active_users(conn).await?,
    })
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: Session,
    AdminActor(admin): AdminActor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let stats = collect_stats(&mut conn).await?;
    let flashes = flash::take(&session).await?;

    Ok(Json(json!({
        "user": admin,
        "stats": stats,
        "flashes": flashes,
    })))
}

pub async fn admin_stats(
    State(state): State<AppState>,
    AdminActor(_admin): AdminActor,
) -> AppResult<Json<Stats>> {
    let mut conn = state.conn().await?;
    Ok(Json(collect_stats(&mut conn).await?))
}

pub async fn admin_users(
    State(state): State<AppState>,
    session: Session,
    AdminActor(_admin): AdminActor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let users = list_users(&mut conn).await?;
    let flashes = flash::take(&session).await?;
    Ok(Json(json!({ "users": users, "flashes": flashes })))
}

pub async fn admin_chats(
    State(state): State<AppState>,
    AdminActor(_admin): AdminActor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let messages = list_messages(&mut conn).await?;
    Ok(Json(json!({ "messages": messages })))
}

pub async fn admin_groups(
    State(state): State<AppState>,
    AdminActor(_admin): AdminActor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let groups = list_groups(&mut conn).await?;
    Ok(Json(json!({ "groups": groups })))
}

pub async fn admin_reports(
    State(state): State<AppState>,
    session: Session,
    AdminActor(_admin): AdminActor,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let reports = list_reports(&mut conn).await?;
    let flashes = flash::take(&session).await?;
    Ok(Json(json!({ "reports": reports, "flashes": flashes })))
}

pub async fn toggle_user(
    State(state): State<AppState>,
    session: Session,
    AdminActor(admin): AdminActor,
    Path(user_id): Path<i64>,
) -> AppResult<Redirect> {
    let mut conn = state.conn().await?;
    let user = get_user_by_id(&mut conn, user_id).await?;
    if user.is_admin() {
        return Err(AppError::BadRequest(anyhow!("Administrators cannot be deactivated")));
    }

    let is_active = !user.is_active;
    set_user_active(&mut conn, user.id, is_active).await?;
    if !is_active {
        disconnect_user(&state, user.id).await;
    }
    tracing::info!(admin_id = admin.id, user_id = user.id, is_active, "User activation toggled");

    let label = if is_active { "activated" } else { "deactivated" };
    flash::push(&session, FlashLevel::Success, format!("User {}", label)).await?;
    Ok(Redirect::to("/admin/users"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    session: Session,
    AdminActor(admin): AdminActor,
    Path(user_id): Path<i64>,
) -> AppResult<Redirect> {
    let mut conn = state.conn().await?;
    let user = get_user_by_id(&mut conn, user_id).await?;
    if user.is_admin() {
        return Err(AppError::BadRequest(anyhow!("Administrators cannot be deleted")));
    }

    remove_user(&mut conn, user.id).await?;
    disconnect_user(&state, user.id).await;
    tracing::info!(admin_id = admin.id, user_id = user.id, "User deleted");

    flash::push(&session, FlashLevel::Success, "User deleted").await?;
    Ok(Redirect::to("/admin/users"))
}

pub async fn handle_report(
    State(state): State<AppState>,
    session: Session,
    AdminActor(admin): AdminActor,
    Path((report_id, action)): Path<(i64, String)>,
) -> AppResult<Redirect> {
    let target = match action.as_str() {
        "review" => ReportStatus::Reviewed,
        "resolve" => ReportStatus::Resolved,
        other => return Err(AppError::BadRequest(anyhow!("Unknown action: {}", other))),
    };

    let mut conn = state.conn().await?;
    let report = get_report_by_id(&mut conn, report_id).await?;

    let moved = report.status.can_advance_to(target)
        && update_report_status(&mut conn, report.id, report.status, target).await?;

    if moved {
        tracing::info!(admin_id = admin.id, report_id = report.id, status = ?target, "Report updated");
        let message = match target {
            ReportStatus::Resolved => "Report marked as resolved",
            _ => "Report marked as reviewed",
        };
        flash::push(&session, FlashLevel::Success, message).await?;
    } else {
        flash::push(&session, FlashLevel::Info, "Report status was not changed").await?;
    }

    Ok(Redirect::to("/admin/reports"))
}
