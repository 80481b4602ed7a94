use crate::app_state::AppState;
use crate::handlers::{chats, groups};
use axum::routing::{get, post};
use axum::Router;

pub fn groups_routes() -> Router<AppState> {
    Router::new()
        .route("/create_group", post(groups::create_group))
        .route("/group/{group_id}", get(chats::group_chat))
        .route("/join_group_request/{group_id}", get(groups::join_group_request))
        .route("/manage_group_requests/{group_id}", get(groups::manage_group_requests))
        .route(
            "/handle_group_request/{request_id}/{action}",
            get(groups::handle_group_request),
        )
}
