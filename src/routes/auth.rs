use crate::app_state::AppState;
use crate::handlers::auth;
use axum::{routing::get, Router};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::index))
        .route("/register", get(auth::auth_page).post(auth::register))
        .route("/login", get(auth::auth_page).post(auth::login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/logout", get(auth::logout))
}
