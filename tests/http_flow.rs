use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use mailgram_backend::{
    app_state::AppState,
    config::AppConfig,
    db,
    models::messages::MessageType,
    queries::users::get_user_by_id,
    routes,
    websocket::fanout::{self, OutgoingMessage},
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc::unbounded_channel;
use tower::ServiceExt;

async fn test_app() -> (Router, AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        database_url: format!("sqlite://{}", dir.path().join("app.db").display()),
        upload_dir: dir.path().join("uploads"),
        max_db_connections: 4,
        bcrypt_cost: 4,
        ..AppConfig::default()
    };
    let pool = db::connect_to_db(&config).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let state = AppState::new(pool, config);
    let app = routes::create_app(state.clone()).await.unwrap();
    (app, state, dir)
}

/// Holds the session cookie of one browser.
#[derive(Default)]
struct Client {
    cookie: Option<String>,
}

impl Client {
    async fn send(&mut self, app: &Router, request: Request<Body>) -> Response {
        let response = app.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    fn builder(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn get(&mut self, app: &Router, uri: &str) -> Response {
        let request = self.builder("GET", uri).body(Body::empty()).unwrap();
        self.send(app, request).await
    }

    async fn post_form(&mut self, app: &Router, uri: &str, form: &str) -> Response {
        let request = self
            .builder("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(app, request).await
    }
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
        .to_string()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(app: &Router, name: &str, phone: &str) -> Client {
    let mut client = Client::default();
    let form = format!("name={}&phone={}&password=secret1", name.replace(' ', "+"), phone);
    let response = client.post_form(app, "/register", &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let form = format!("phone={}&password=secret1", phone);
    let response = client.post_form(app, "/login", &form).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    client
}

async fn own_id(client: &mut Client, app: &Router) -> i64 {
    let body = json_body(client.get(app, "/dashboard").await).await;
    body["user"]["id"].as_i64().unwrap()
}

async fn unread_count(client: &mut Client, app: &Router) -> i64 {
    let body = json_body(client.get(app, "/dashboard").await).await;
    body["unread_count"].as_i64().unwrap()
}

async fn send_text(state: &AppState, from: i64, to: i64, text: &str) {
    let mut conn = state.conn().await.unwrap();
    let sender = get_user_by_id(&mut conn, from).await.unwrap();
    let message = OutgoingMessage {
        content: text.to_string(),
        message_type: MessageType::Text,
        file_path: None,
    };
    fanout::send_direct(&mut conn, &state.channels, &sender, to, message)
        .await
        .unwrap();
}

async fn count_rows(state: &AppState, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&state.db_pool)
        .await
        .unwrap()
}

async fn admin_login(app: &Router) -> Client {
    let mut admin = Client::default();
    let response = admin
        .post_form(app, "/login", "phone=admin&password=admin123")
        .await;
    assert_eq!(location(&response), "/admin");
    admin
}

async fn admin_user_id(admin: &mut Client, app: &Router, username: &str) -> i64 {
    let users = json_body(admin.get(app, "/admin/users").await).await;
    users["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == username)
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

#[tokio::test]
async fn register_login_and_view_empty_dashboard() {
    let (app, _state, _dir) = test_app().await;
    let mut client = register_and_login(&app, "Ali Reza", "09120000001").await;

    let response = client.get(&app, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["user"]["username"], "alireza");
    assert_eq!(body["user"]["email_id"], "alireza@Mailgram.com");
    assert_eq!(body["groups"].as_array().unwrap().len(), 0);
    assert_eq!(body["contacts"].as_array().unwrap().len(), 0);
    assert_eq!(body["users"].as_array().unwrap().len(), 0);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn protected_routes_need_a_session() {
    let (app, _state, _dir) = test_app().await;
    let mut anonymous = Client::default();

    let response = anonymous.get(&app, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = anonymous.get(&app, "/").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn wrong_password_and_duplicate_phone_are_refused() {
    let (app, _state, _dir) = test_app().await;
    let mut client = register_and_login(&app, "Sara", "09120000002").await;

    let response = client
        .post_form(&app, "/register", "name=Other&phone=09120000002&password=secret1")
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut stranger = Client::default();
    let response = stranger
        .post_form(&app, "/login", "phone=09120000002&password=wrongpass")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn group_join_is_gated_by_creator_approval() {
    let (app, _state, _dir) = test_app().await;
    let mut owner = register_and_login(&app, "Owner", "09120000011").await;
    let mut joiner = register_and_login(&app, "Joiner", "09120000012").await;

    let response = owner
        .post_form(&app, "/create_group", "name=Team&description=Our+team")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let group_path = location(&response);
    let group_id = group_path.trim_start_matches("/group/").to_string();
    assert!(group_id.starts_with("group_"));

    let response = owner.get(&app, &group_path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["is_admin"], true);
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["username"], "owner");

    let response = joiner.get(&app, &group_path).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = joiner
        .get(&app, &format!("/join_group_request/{}", group_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    // A second request while pending changes nothing.
    joiner
        .get(&app, &format!("/join_group_request/{}", group_id))
        .await;

    let response = joiner
        .get(&app, &format!("/manage_group_requests/{}", group_id))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = owner
        .get(&app, &format!("/manage_group_requests/{}", group_id))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let requests = body["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["username"], "joiner");
    let request_id = requests[0]["id"].as_i64().unwrap();

    let response = joiner
        .get(&app, &format!("/handle_group_request/{}/approve", request_id))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = owner
        .get(&app, &format!("/handle_group_request/{}/approve", request_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = joiner.get(&app, &group_path).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["members"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_bypass_reaches_moderation_surface() {
    let (app, state, _dir) = test_app().await;
    let mut member = register_and_login(&app, "Member", "09120000021").await;

    let response = member.get(&app, "/admin/api/stats").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut admin = Client::default();
    let response = admin
        .post_form(&app, "/login", "phone=admin&password=admin123")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    let response = admin.get(&app, "/admin/api/stats").await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(response).await;
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["active_users"], 2);
    assert_eq!(stats["total_groups"], 0);

    let member_id = admin_user_id(&mut admin, &app, "member").await;

    let (tx, mut rx) = unbounded_channel();
    state.channels.bind(member_id, tx).await;

    let response = admin
        .get(&app, &format!("/admin/toggle_user/{}", member_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // The deactivated member's live socket and session are both dropped.
    assert!(!state.channels.is_online(member_id).await);
    assert!(rx.recv().await.is_none());
    let response = member.get(&app, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn administrators_cannot_be_toggled_or_deleted() {
    let (app, _state, _dir) = test_app().await;
    let mut admin = admin_login(&app).await;
    let admin_id = admin_user_id(&mut admin, &app, "admin").await;

    let response = admin
        .get(&app, &format!("/admin/toggle_user/{}", admin_id))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = admin
        .get(&app, &format!("/admin/delete_user/{}", admin_id))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = admin.get(&app, "/admin/api/stats").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reading_a_chat_clears_only_incoming_unread() {
    let (app, state, _dir) = test_app().await;
    let mut ali = register_and_login(&app, "Ali", "09120000031").await;
    let mut sara = register_and_login(&app, "Sara", "09120000032").await;
    let ali_id = own_id(&mut ali, &app).await;
    let sara_id = own_id(&mut sara, &app).await;

    send_text(&state, ali_id, sara_id, "salam").await;
    assert_eq!(unread_count(&mut sara, &app).await, 1);
    assert_eq!(unread_count(&mut ali, &app).await, 0);

    send_text(&state, sara_id, ali_id, "salam, chetori?").await;
    assert_eq!(unread_count(&mut ali, &app).await, 1);

    let response = sara.get(&app, &format!("/chat/{}", ali_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);

    assert_eq!(unread_count(&mut sara, &app).await, 0);
    // Sara's own outgoing message stays unread for Ali.
    assert_eq!(unread_count(&mut ali, &app).await, 1);
}

#[tokio::test]
async fn report_status_only_moves_forward() {
    let (app, _state, _dir) = test_app().await;
    let mut ali = register_and_login(&app, "Ali", "09120000041").await;
    let mut sara = register_and_login(&app, "Sara", "09120000042").await;
    let ali_id = own_id(&mut ali, &app).await;

    let response = sara
        .post_form(&app, &format!("/report_user/{}", ali_id), "reason=spam")
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let mut admin = admin_login(&app).await;
    let body = json_body(admin.get(&app, "/admin/reports").await).await;
    let report = &body["reports"][0];
    assert_eq!(report["status"], "pending");
    assert_eq!(report["reported_user_id"], ali_id);
    let report_id = report["id"].as_i64().unwrap();

    let response = admin
        .get(&app, &format!("/admin/handle_report/{}/resolve", report_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = admin
        .get(&app, &format!("/admin/handle_report/{}/review", report_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = json_body(admin.get(&app, "/admin/reports").await).await;
    assert_eq!(body["reports"][0]["status"], "resolved");
    let flashes = body["flashes"].as_array().unwrap();
    assert_eq!(flashes.len(), 2);
    assert_eq!(flashes[0]["level"], "success");
    assert_eq!(flashes[1]["level"], "info");

    let response = admin
        .get(&app, &format!("/admin/handle_report/{}/reopen", report_id))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_a_user_cascades_to_owned_rows() {
    let (app, state, _dir) = test_app().await;
    let mut ali = register_and_login(&app, "Ali", "09120000051").await;
    let mut sara = register_and_login(&app, "Sara", "09120000052").await;
    let ali_id = own_id(&mut ali, &app).await;
    let sara_id = own_id(&mut sara, &app).await;

    let response = ali
        .post_form(&app, "/create_group", "name=Family")
        .await;
    let group_id = location(&response).trim_start_matches("/group/").to_string();
    sara.get(&app, &format!("/join_group_request/{}", group_id))
        .await;
    sara.get(&app, "/add_contact/ali@Mailgram.com").await;
    ali.get(&app, "/add_contact/sara@Mailgram.com").await;
    send_text(&state, ali_id, sara_id, "salam").await;
    send_text(&state, sara_id, ali_id, "salam").await;
    sara.post_form(&app, &format!("/report_user/{}", ali_id), "reason=spam")
        .await;

    assert_eq!(count_rows(&state, "contacts").await, 2);
    assert_eq!(count_rows(&state, "group_members").await, 2);
    assert_eq!(count_rows(&state, "messages").await, 2);
    assert_eq!(count_rows(&state, "reports").await, 1);

    let (tx, _rx) = unbounded_channel();
    state.channels.bind(ali_id, tx).await;

    let mut admin = admin_login(&app).await;
    let response = admin
        .get(&app, &format!("/admin/delete_user/{}", ali_id))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    assert!(!state.channels.is_online(ali_id).await);
    assert_eq!(count_rows(&state, "users").await, 2);
    assert_eq!(count_rows(&state, "groups").await, 0);
    assert_eq!(count_rows(&state, "group_members").await, 0);
    assert_eq!(count_rows(&state, "contacts").await, 0);
    assert_eq!(count_rows(&state, "messages").await, 0);
    assert_eq!(count_rows(&state, "reports").await, 0);

    let response = ali.get(&app, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = sara.get(&app, "/dashboard").await;
    assert_eq!(response.status(), StatusCode::OK);
}
