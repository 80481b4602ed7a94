use anyhow::anyhow;
use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::sessions::{UserSession, USER_SESSION_KEY};
use crate::models::users::User;
use crate::queries::users::find_user_by_id;

pub async fn auth_middleware(
    session: Session,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    // Check if the session has a user session
    match session.get::<UserSession>(USER_SESSION_KEY).await {
        Ok(Some(_user_session)) => Ok(next.run(req).await),
        Ok(None) => {
            tracing::debug!(path = %req.uri().path(), "Request without user session");
            Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load session");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// The authenticated, active user behind the request.
pub struct Actor(pub User);

impl<S> FromRequestParts<S> for Actor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::InternalServerError(anyhow!(msg)))?;

        let user_session = session
            .get::<UserSession>(USER_SESSION_KEY)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow!("User session not found")))?;

        let state = AppState::from_ref(state);
        let mut conn = state.conn().await?;

        let user = find_user_by_id(&mut conn, user_session.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow!("User no longer exists")))?;

        if !user.is_active {
            tracing::info!(user_id = user.id, "Refusing session of disabled account");
            return Err(AppError::Unauthorized(anyhow!("Account is disabled")));
        }

        Ok(Actor(user))
    }
}

/// An [`Actor`] holding the administrator capability.
pub struct AdminActor(pub User);

impl<S> FromRequestParts<S> for AdminActor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Actor(user) = Actor::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = user.id, "Non-admin attempted admin access");
            return Err(AppError::Forbidden(anyhow!("Access denied")));
        }
        Ok(AdminActor(user))
    }
}
