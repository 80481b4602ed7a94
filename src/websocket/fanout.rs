//! Persist-then-deliver. Nothing is sent when the write fails, and events
//! for users without a live session are dropped; the store keeps the
//! message for the next history fetch.

use anyhow::anyhow;
use sqlx::SqliteConnection;

use crate::error::{AppError, AppResult};
use crate::membership::gate::{can_access, ensure_group_access, Conversation};
use crate::models::messages::{Addressing, Message, MessageType, NewMessage};
use crate::models::users::User;
use crate::models::websocket::{Presence, ServerEvent};
use crate::queries::groups::{get_group_by_public_id, list_approved_member_ids};
use crate::queries::messages::insert_message;
use crate::queries::users::find_user_by_id;
use crate::utils::uploads::is_upload_url;
use crate::websocket::manager::{ChannelRegistry, ConnectionId};

/// Message body as received from a client.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub content: String,
    pub message_type: MessageType,
    pub file_path: Option<String>,
}

impl OutgoingMessage {
    fn validate(&self) -> AppResult<()> {
        if let Some(path) = &self.file_path {
            if !is_upload_url(path) {
                return Err(AppError::BadRequest(anyhow!("Invalid file path")));
            }
        }
        if self.content.trim().is_empty() && self.file_path.is_none() {
            return Err(AppError::BadRequest(anyhow!("Message cannot be empty")));
        }
        Ok(())
    }

    fn into_new_message(self, sender_id: i64, addressing: Addressing) -> NewMessage {
        NewMessage {
            sender_id,
            addressing,
            message_type: self.message_type,
            content: self.content,
            file_path: self.file_path,
        }
    }
}

pub enum TypingTarget {
    Direct(i64),
    Group(String),
}

pub async fn send_direct(
    conn: &mut SqliteConnection,
    channels: &ChannelRegistry,
    sender: &User,
    receiver_id: i64,
    message: OutgoingMessage,
) -> AppResult<Message> {
    message.validate()?;

    if find_user_by_id(conn, receiver_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow!("User {} not found", receiver_id)));
    }
    let conversation = Conversation::Direct {
        sender_id: sender.id,
        receiver_id,
    };
    if !can_access(conn, sender, conversation).await? {
        return Err(AppError::Forbidden(anyhow!("Cannot message this user")));
    }

    let stored = insert_message(
        conn,
        &message.into_new_message(sender.id, Addressing::Direct { receiver_id }),
    )
    .await?;

    let delivered = channels
        .send_to_user(
            receiver_id,
            ServerEvent::NewMessage {
                id: stored.id,
                sender_id: sender.id,
                sender_name: sender.name.clone(),
                content: stored.content.clone(),
                timestamp: stored.timestamp,
                message_type: stored.message_type,
                file_path: stored.file_path.clone(),
            },
        )
        .await;
    channels
        .send_to_user(
            sender.id,
            ServerEvent::MessageSent {
                id: stored.id,
                timestamp: stored.timestamp,
            },
        )
        .await;

    tracing::debug!(
        message_id = stored.id,
        sender_id = sender.id,
        receiver_id,
        delivered,
        "Direct message fanned out"
    );
    Ok(stored)
}

/// The sender is an approved member and receives their own message back.
pub async fn send_group(
    conn: &mut SqliteConnection,
    channels: &ChannelRegistry,
    sender: &User,
    group_public_id: &str,
    message: OutgoingMessage,
) -> AppResult<Message> {
    message.validate()?;

    let group = get_group_by_public_id(conn, group_public_id).await?;
    ensure_group_access(conn, sender, &group).await?;

    let stored = insert_message(
        conn,
        &message.into_new_message(sender.id, Addressing::Group { group_id: group.id }),
    )
    .await?;

    let event = ServerEvent::NewGroupMessage {
        id: stored.id,
        group_id: group.group_id.clone(),
        sender_id: sender.id,
        sender_name: sender.name.clone(),
        content: stored.content.clone(),
        timestamp: stored.timestamp,
        message_type: stored.message_type,
        file_path: stored.file_path.clone(),
    };

    let mut delivered = 0;
    for member_id in list_approved_member_ids(conn, group.id).await? {
        delivered += channels.send_to_user(member_id, event.clone()).await;
    }

    tracing::debug!(
        message_id = stored.id,
        group = %group.group_id,
        sender_id = sender.id,
        delivered,
        "Group message fanned out"
    );
    Ok(stored)
}

pub async fn typing(
    conn: &mut SqliteConnection,
    channels: &ChannelRegistry,
    actor: &User,
    target: TypingTarget,
    is_typing: bool,
) -> AppResult<()> {
    match target {
        TypingTarget::Direct(receiver_id) => {
            let conversation = Conversation::Direct {
                sender_id: actor.id,
                receiver_id,
            };
            if !can_access(conn, actor, conversation).await? {
                return Err(AppError::Forbidden(anyhow!("Cannot message this user")));
            }
            channels
                .send_to_user(
                    receiver_id,
                    ServerEvent::UserTyping {
                        user_id: actor.id,
                        user_name: actor.name.clone(),
                        typing: is_typing,
                    },
                )
                .await;
        }
        TypingTarget::Group(public_id) => {
            let group = get_group_by_public_id(conn, &public_id).await?;
            ensure_group_access(conn, actor, &group).await?;

            let event = ServerEvent::GroupTyping {
                group_id: group.group_id.clone(),
                user_id: actor.id,
                user_name: actor.name.clone(),
                typing: is_typing,
            };
            for member_id in list_approved_member_ids(conn, group.id).await? {
                if member_id != actor.id {
                    channels.send_to_user(member_id, event.clone()).await;
                }
            }
        }
    }
    Ok(())
}

/// Tell every other live session that `user_id` came or went.
pub async fn announce_presence(
    channels: &ChannelRegistry,
    user_id: i64,
    status: Presence,
    except: Option<ConnectionId>,
) -> usize {
    channels
        .broadcast(ServerEvent::UserStatus { user_id, status }, except)
        .await
}
