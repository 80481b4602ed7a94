use crate::app_state::AppState;
use crate::handlers::{chats, contacts, dashboard, reports, uploads};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

pub fn chats_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/chat/{user_id}", get(chats::direct_chat))
        .route("/add_contact/{email_id}", get(contacts::add_contact))
        .route("/report_user/{user_id}", post(reports::report_user))
        .route(
            "/upload",
            post(uploads::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}
