use anyhow::anyhow;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    middlewares::auth::Actor,
    models::{
        users::User,
        websocket::{ClientEvent, Presence, ServerEvent},
    },
    queries::users::{find_user_by_id, touch_last_seen},
    websocket::{
        fanout::{self, OutgoingMessage, TypingTarget},
        manager::ConnectionId,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Actor(user): Actor,
) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, user.id))
}

async fn handle_websocket(socket: WebSocket, state: AppState, user_id: i64) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ServerEvent>();

    // Spawn task to handle outgoing events
    let outgoing_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode websocket event"),
            }
        }
    });

    let conn_id = open_channel(&state, user_id, tx).await;
    tracing::info!(user_id, connection = %conn_id, "WebSocket connected");

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match handle_text_message(&state, user_id, conn_id, text.as_str()).await {
                    Ok(()) => {}
                    Err(AppError::Unauthorized(e)) => {
                        tracing::info!(user_id, error = %e, "Closing websocket of disabled account");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Rejected websocket event");
                        state
                            .channels
                            .send_to_connection(
                                conn_id,
                                ServerEvent::Error {
                                    message: e.to_string(),
                                },
                            )
                            .await;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(user_id, "Client closed websocket");
                break;
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Error receiving websocket frame");
                break;
            }
            _ => {}
        }
    }

    // cleanup when connection closes
    close_channel(&state, user_id, conn_id).await;
    outgoing_task.abort();

    tracing::info!(user_id, connection = %conn_id, "WebSocket disconnected");
}

/// Bind a new session and tell every other live session the user is online.
async fn open_channel(
    state: &AppState,
    user_id: i64,
    tx: UnboundedSender<ServerEvent>,
) -> ConnectionId {
    let conn_id = state.channels.bind(user_id, tx).await;
    mark_seen(state, user_id).await;
    fanout::announce_presence(&state.channels, user_id, Presence::Online, Some(conn_id)).await;
    conn_id
}

/// Unbind a session and announce `offline`. A session an admin already
/// dropped was announced then.
async fn close_channel(state: &AppState, user_id: i64, conn_id: ConnectionId) {
    if state.channels.unbind(conn_id).await.is_some() {
        fanout::announce_presence(&state.channels, user_id, Presence::Offline, None).await;
    }
    mark_seen(state, user_id).await;
}

async fn mark_seen(state: &AppState, user_id: i64) {
    let result = match state.conn().await {
        Ok(mut conn) => touch_last_seen(&mut conn, user_id, Utc::now()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(user_id, error = %e, "Failed to update last_seen");
    }
}

async fn handle_text_message(
    state: &AppState,
    user_id: i64,
    conn_id: ConnectionId,
    text: &str,
) -> AppResult<()> {
    let event: ClientEvent = serde_json::from_str(text)
        .map_err(|e| AppError::BadRequest(anyhow!("Invalid event: {}", e)))?;

    let mut conn = state.conn().await?;

    // Deactivation takes effect on the next event, not the next connect.
    let actor = find_user_by_id(&mut conn, user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::Unauthorized(anyhow!("Account is disabled")))?;
    drop(conn);

    dispatch(state, &actor, conn_id, event).await
}

/// Run one inbound event for `actor` arriving on connection `conn_id`.
pub async fn dispatch(
    state: &AppState,
    actor: &User,
    conn_id: ConnectionId,
    event: ClientEvent,
) -> AppResult<()> {
    let mut conn = state.conn().await?;

    match event {
        ClientEvent::PrivateMessage {
            receiver_id,
            message,
            message_type,
            file_path,
        } => {
            fanout::send_direct(
                &mut conn,
                &state.channels,
                actor,
                receiver_id,
                OutgoingMessage {
                    content: message,
                    message_type,
                    file_path,
                },
            )
            .await?;
        }
        ClientEvent::GroupMessage {
            group_id,
            message,
            message_type,
            file_path,
        } => {
            fanout::send_group(
                &mut conn,
                &state.channels,
                actor,
                &group_id,
                OutgoingMessage {
                    content: message,
                    message_type,
                    file_path,
                },
            )
            .await?;
        }
        ClientEvent::Typing {
            receiver_id,
            group_id,
            typing,
        } => {
            let target = match (receiver_id, group_id) {
                (Some(receiver_id), None) => TypingTarget::Direct(receiver_id),
                (None, Some(group_id)) => TypingTarget::Group(group_id),
                _ => {
                    return Err(AppError::BadRequest(anyhow!(
                        "Typing needs exactly one of receiver_id or group_id"
                    )))
                }
            };
            fanout::typing(&mut conn, &state.channels, actor, target, typing).await?;
        }
        ClientEvent::Ping => {
            state
                .channels
                .send_to_connection(conn_id, ServerEvent::Pong)
                .await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_user, test_state};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn private_message_event_is_delivered_exactly_once() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let a = create_user(&mut conn, "Ali", "0911").await;
        let b = create_user(&mut conn, "Sara", "0912").await;
        let c = create_user(&mut conn, "Reza", "0913").await;
        drop(conn);

        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let (tx_c, mut rx_c) = unbounded_channel();
        let conn_a = state.channels.bind(a.id, tx_a).await;
        state.channels.bind(b.id, tx_b).await;
        state.channels.bind(c.id, tx_c).await;

        let event: ClientEvent = serde_json::from_str(&format!(
            r#"{{"event":"private_message","receiver_id":{},"message":"hi","type":"text"}}"#,
            b.id
        ))
        .unwrap();
        dispatch(&state, &a, conn_a, event).await.unwrap();

        let to_b = drain(&mut rx_b);
        assert_eq!(to_b.len(), 1);
        assert!(matches!(to_b[0], ServerEvent::NewMessage { .. }));

        let to_a = drain(&mut rx_a);
        assert_eq!(to_a.len(), 1);
        assert!(matches!(to_a[0], ServerEvent::MessageSent { .. }));

        assert!(drain(&mut rx_c).is_empty());
    }

    #[tokio::test]
    async fn ping_answers_only_the_asking_connection() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let a = create_user(&mut conn, "Ali", "0911").await;
        drop(conn);

        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, mut rx2) = unbounded_channel();
        let first = state.channels.bind(a.id, tx1).await;
        state.channels.bind(a.id, tx2).await;

        dispatch(&state, &a, first, ClientEvent::Ping).await.unwrap();
        assert_eq!(drain(&mut rx1), vec![ServerEvent::Pong]);
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn opening_and_closing_announce_presence_to_others() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let a = create_user(&mut conn, "Ali", "0911").await;
        let b = create_user(&mut conn, "Sara", "0912").await;
        drop(conn);

        let (tx_b, mut rx_b) = unbounded_channel();
        state.channels.bind(b.id, tx_b).await;

        let (tx_a, mut rx_a) = unbounded_channel();
        let conn_a = open_channel(&state, a.id, tx_a).await;
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::UserStatus {
                user_id: a.id,
                status: Presence::Online,
            }]
        );

        close_channel(&state, a.id, conn_a).await;
        assert!(!state.channels.is_online(a.id).await);
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::UserStatus {
                user_id: a.id,
                status: Presence::Offline,
            }]
        );

        // Closing twice does not announce again.
        close_channel(&state, a.id, conn_a).await;
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn ambiguous_typing_target_is_rejected() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let a = create_user(&mut conn, "Ali", "0911").await;
        drop(conn);

        let (tx, _rx) = unbounded_channel();
        let conn_id = state.channels.bind(a.id, tx).await;
        let event = ClientEvent::Typing {
            receiver_id: None,
            group_id: None,
            typing: true,
        };
        let result = dispatch(&state, &a, conn_id, event).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
