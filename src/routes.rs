mod admin;
mod auth;
mod chats;
mod groups;
mod websocket;

use crate::app_state::AppState;
use crate::middlewares::auth::auth_middleware;
use axum::{http::header, middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

pub async fn create_app(state: AppState) -> anyhow::Result<Router> {
    let session_store = SqliteStore::new(state.db_pool.clone());
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.secure_cookies)
        .with_expiry(Expiry::OnInactivity(Duration::hours(
            state.config.session_ttl_hours,
        )));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE]);

    // Protected routes that require authentication
    let protected = Router::new()
        .merge(auth::session_routes())
        .merge(chats::chats_routes(state.config.max_upload_bytes))
        .merge(groups::groups_routes())
        .merge(websocket::websocket_routes())
        .nest("/admin", admin::admin_routes())
        .route_layer(middleware::from_fn(auth_middleware));

    let app = Router::new()
        .merge(auth::public_routes())
        .merge(protected)
        .nest_service("/static/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(session_layer)
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}
