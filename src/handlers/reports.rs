use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    response::Redirect,
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::middlewares::auth::Actor;
use crate::queries::{reports::insert_report, users::get_user_by_id};
use crate::utils::flash::{self, FlashLevel};

#[derive(Deserialize, Validate)]
pub struct ReportUser {
    #[validate(length(min = 1, max = 1000, message = "A reason is required and cannot exceed 1000 characters"))]
    reason: String,
}

pub async fn report_user(
    State(state): State<AppState>,
    session: Session,
    Actor(user): Actor,
    Path(reported_id): Path<i64>,
    Form(mut payload): Form<ReportUser>,
) -> AppResult<Redirect> {
    payload.reason = payload.reason.trim().to_string();
    payload.validate()?;

    let mut conn = state.conn().await?;
    let reported = get_user_by_id(&mut conn, reported_id).await?;
    if reported.id == user.id {
        return Err(AppError::BadRequest(anyhow!("You cannot report yourself")));
    }

    let report = insert_report(&mut conn, user.id, reported.id, &payload.reason).await?;
    tracing::info!(
        report_id = report.id,
        reporter_id = user.id,
        reported_user_id = reported.id,
        "User reported"
    );

    flash::push(&session, FlashLevel::Success, "Report submitted").await?;
    Ok(Redirect::to("/dashboard"))
}
