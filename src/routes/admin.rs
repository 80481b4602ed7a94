use crate::app_state::AppState;
use crate::handlers::admin;
use axum::{routing::get, Router};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::admin_dashboard))
        .route("/api/stats", get(admin::admin_stats))
        .route("/users", get(admin::admin_users))
        .route("/chats", get(admin::admin_chats))
        .route("/groups", get(admin::admin_groups))
        .route("/reports", get(admin::admin_reports))
        .route("/toggle_user/{user_id}", get(admin::toggle_user))
        .route("/delete_user/{user_id}", get(admin::delete_user))
        .route("/handle_report/{report_id}/{action}", get(admin::handle_report))
}
