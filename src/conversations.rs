//! Read side of conversations: full histories, oldest first, no paging.

use sqlx::SqliteConnection;

use crate::error::AppResult;
use crate::membership::gate::ensure_group_access;
use crate::models::groups::Group;
use crate::models::messages::Message;
use crate::models::users::User;
use crate::queries::messages;

/// Every message exchanged between `a` and `b`, in either direction.
/// Symmetric in its arguments.
pub async fn fetch_direct_history(
    conn: &mut SqliteConnection,
    a: i64,
    b: i64,
) -> AppResult<Vec<Message>> {
    messages::fetch_direct_history(conn, a, b).await
}

/// Group history for an approved member; `Forbidden` for anyone else.
pub async fn fetch_group_history(
    conn: &mut SqliteConnection,
    actor: &User,
    group: &Group,
) -> AppResult<Vec<Message>> {
    ensure_group_access(conn, actor, group).await?;
    messages::fetch_group_history(conn, group.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::groups::MembershipStatus;
    use crate::models::messages::{Addressing, MessageType, NewMessage};
    use crate::queries::groups::{insert_group, insert_member};
    use crate::queries::messages::insert_message;
    use crate::test_support::{create_user, test_state};

    fn direct(sender_id: i64, receiver_id: i64, content: &str) -> NewMessage {
        NewMessage {
            sender_id,
            addressing: Addressing::Direct { receiver_id },
            message_type: MessageType::Text,
            content: content.to_string(),
            file_path: None,
        }
    }

    #[tokio::test]
    async fn direct_history_is_symmetric_and_ordered() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let a = create_user(&mut conn, "Ali", "0911").await;
        let b = create_user(&mut conn, "Sara", "0912").await;
        let c = create_user(&mut conn, "Reza", "0913").await;

        insert_message(&mut conn, &direct(a.id, b.id, "one")).await.unwrap();
        insert_message(&mut conn, &direct(b.id, a.id, "two")).await.unwrap();
        insert_message(&mut conn, &direct(a.id, c.id, "elsewhere")).await.unwrap();
        insert_message(&mut conn, &direct(a.id, b.id, "three")).await.unwrap();

        let ab = fetch_direct_history(&mut conn, a.id, b.id).await.unwrap();
        let ba = fetch_direct_history(&mut conn, b.id, a.id).await.unwrap();

        let contents: Vec<_> = ab.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["one", "two", "three"]);
        assert_eq!(
            ab.iter().map(|m| m.id).collect::<Vec<_>>(),
            ba.iter().map(|m| m.id).collect::<Vec<_>>()
        );
        assert!(ab.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn group_history_only_for_approved_members() {
        let (state, _dir) = test_state().await;
        let mut conn = state.db_pool.acquire().await.unwrap();
        let owner = create_user(&mut conn, "Owner", "0911").await;
        let pending = create_user(&mut conn, "Pending", "0912").await;
        let stranger = create_user(&mut conn, "Stranger", "0913").await;

        let group = insert_group(&mut conn, "Team", "group_00ff00ff", owner.id, None)
            .await
            .unwrap();
        insert_member(&mut conn, group.id, owner.id, MembershipStatus::Approved, true)
            .await
            .unwrap();
        insert_member(&mut conn, group.id, pending.id, MembershipStatus::Pending, false)
            .await
            .unwrap();
        insert_message(
            &mut conn,
            &NewMessage {
                sender_id: owner.id,
                addressing: Addressing::Group { group_id: group.id },
                message_type: MessageType::Text,
                content: "welcome".to_string(),
                file_path: None,
            },
        )
        .await
        .unwrap();

        let history = fetch_group_history(&mut conn, &owner, &group).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "welcome");

        for outsider in [&pending, &stranger] {
            let result = fetch_group_history(&mut conn, outsider, &group).await;
            assert!(matches!(result, Err(AppError::Forbidden(_))));
        }
    }
}
