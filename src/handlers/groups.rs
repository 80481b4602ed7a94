use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    Form, Json,
};
use serde::Deserialize;
use serde_json::json;
use tower_sessions::Session;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::membership::gate::ensure_group_admin;
use crate::membership::join::{self, Decision, DecisionOutcome, JoinOutcome};
use crate::middlewares::auth::Actor;
use crate::models::groups::MembershipStatus;
use crate::queries::groups::{
    get_group_by_public_id, insert_group, insert_member, list_pending_requests,
};
use crate::utils::flash::{self, FlashLevel};

#[derive(Deserialize, Validate)]
pub struct CreateGroup {
    #[validate(length(min = 1, max = 100, message = "Group name is required and cannot exceed 100 characters"))]
    name: String,

    #[serde(default)]
    description: Option<String>,
}

fn new_public_group_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("group_{}", &hex[..8])
}

pub async fn create_group(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Form(mut payload): Form<CreateGroup>,
) -> AppResult<Redirect> {
    payload.name = payload.name.trim().to_string();
    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    payload.validate()?;

    let mut tx = state
        .db_pool
        .begin()
        .await
        .map_err(|e| AppError::database(e, "Database error creating group"))?;

    let public_id = new_public_group_id();
    let group = insert_group(&mut tx, &payload.name, &public_id, user.id, description.as_deref())
        .await?;
    insert_member(&mut tx, group.id, user.id, MembershipStatus::Approved, true).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::database(e, "Database error committing group"))?;

    tracing::info!(group = %group.group_id, creator_id = user.id, "Group created");

    flash::push(&session, FlashLevel::Success, "Group created successfully").await?;
    Ok(Redirect::to(&format!("/group/{}", group.group_id)))
}

pub async fn join_group_request(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(group_id): Path<String>,
) -> AppResult<Redirect> {
    let mut conn = state.conn().await?;
    let group = get_group_by_public_id(&mut conn, &group_id).await?;

    let (level, message) = match join::request_join(&mut conn, &user, &group).await? {
        JoinOutcome::Requested => (FlashLevel::Success, "Your membership request has been sent"),
        JoinOutcome::AlreadyPending => (FlashLevel::Info, "Your membership request is under review"),
        JoinOutcome::AlreadyMember => (FlashLevel::Info, "You are already a member of this group"),
        JoinOutcome::Rejected => (FlashLevel::Info, "Your membership request was declined"),
    };

    flash::push(&session, level, message).await?;
    Ok(Redirect::to("/dashboard"))
}

pub async fn manage_group_requests(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(group_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.conn().await?;
    let group = get_group_by_public_id(&mut conn, &group_id).await?;
    ensure_group_admin(&user, &group)?;

    let requests = list_pending_requests(&mut conn, group.id).await?;
    let flashes = flash::take(&session).await?;

    Ok(Json(json!({
        "group": group,
        "requests": requests,
        "flashes": flashes,
    })))
}

pub async fn handle_group_request(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path((request_id, action)): Path<(i64, String)>,
) -> AppResult<Redirect> {
    let decision: Decision = action.parse()?;

    let mut conn = state.conn().await?;
    let (group, outcome) = join::decide(&mut conn, &user, request_id, decision).await?;

    let (level, message) = match (outcome, decision) {
        (DecisionOutcome::Applied(_), Decision::Approve) => {
            (FlashLevel::Success, "The user has been added to the group".to_string())
        }
        (DecisionOutcome::Applied(_), Decision::Reject) => {
            (FlashLevel::Info, "The membership request was rejected".to_string())
        }
        (DecisionOutcome::AlreadyDecided(status), _) => (
            FlashLevel::Info,
            format!("This request was already {}", status_label(status)),
        ),
    };

    flash::push(&session, level, message).await?;
    Ok(Redirect::to(&format!("/manage_group_requests/{}", group.group_id)))
}

fn status_label(status: MembershipStatus) -> &'static str {
    match status {
        MembershipStatus::Pending => "pending",
        MembershipStatus::Approved => "approved",
        MembershipStatus::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_ids_are_prefixed_hex() {
        let id = new_public_group_id();
        assert!(id.starts_with("group_"));
        assert_eq!(id.len(), "group_".len() + 8);
        assert!(id["group_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn group_name_is_required() {
        let payload = CreateGroup {
            name: String::new(),
            description: None,
        };
        assert!(payload.validate().is_err());
    }
}
