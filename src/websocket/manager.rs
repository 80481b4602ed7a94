use crate::models::websocket::ServerEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identifies one live websocket session.
pub type ConnectionId = Uuid;

#[derive(Default)]
struct Registry {
    // connection -> user
    sessions: HashMap<ConnectionId, i64>,
    // user -> live connections
    channels: HashMap<i64, HashMap<ConnectionId, UnboundedSender<ServerEvent>>>,
}

impl Registry {
    fn remove(&mut self, conn_id: ConnectionId) -> Option<i64> {
        let user_id = self.sessions.remove(&conn_id)?;
        if let Some(connections) = self.channels.get_mut(&user_id) {
            connections.remove(&conn_id);
            if connections.is_empty() {
                self.channels.remove(&user_id);
            }
        }
        Some(user_id)
    }

    fn remove_user(&mut self, user_id: i64) -> usize {
        let Some(connections) = self.channels.remove(&user_id) else {
            return 0;
        };
        for conn_id in connections.keys() {
            self.sessions.remove(conn_id);
        }
        connections.len()
    }
}

/// Per-user inbox channels. A user has one channel holding every live
/// session of theirs; all mutation goes through one lock and sends work
/// on a snapshot taken under the read lock.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn bind(&self, user_id: i64, sender: UnboundedSender<ServerEvent>) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        let mut registry = self.inner.write().await;
        registry.sessions.insert(conn_id, user_id);
        let connections = registry.channels.entry(user_id).or_default();
        connections.insert(conn_id, sender);

        tracing::debug!(
            user_id,
            connection = %conn_id,
            sessions = connections.len(),
            "Bound connection to user channel"
        );
        conn_id
    }

    /// Returns the user the connection was bound to, if it still was.
    pub async fn unbind(&self, conn_id: ConnectionId) -> Option<i64> {
        let user_id = self.inner.write().await.remove(conn_id);
        if let Some(user_id) = user_id {
            tracing::debug!(user_id, connection = %conn_id, "Unbound connection");
        }
        user_id
    }

    /// Drop every live session of `user_id`. Their outgoing tasks end once
    /// the senders are gone. Returns how many sessions were dropped.
    pub async fn unbind_user(&self, user_id: i64) -> usize {
        let dropped = self.inner.write().await.remove_user(user_id);
        if dropped > 0 {
            tracing::debug!(user_id, sessions = dropped, "Unbound every connection of user");
        }
        dropped
    }

    /// Deliver to every live session of `user_id`. Returns the number of
    /// sessions reached; zero means the event was dropped.
    pub async fn send_to_user(&self, user_id: i64, event: ServerEvent) -> usize {
        let targets: Vec<_> = {
            let registry = self.inner.read().await;
            match registry.channels.get(&user_id) {
                Some(connections) => connections
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
                None => return 0,
            }
        };

        self.deliver(targets, &event).await
    }

    pub async fn send_to_connection(&self, conn_id: ConnectionId, event: ServerEvent) -> bool {
        let target = {
            let registry = self.inner.read().await;
            registry.sessions.get(&conn_id).and_then(|user_id| {
                registry
                    .channels
                    .get(user_id)
                    .and_then(|connections| connections.get(&conn_id))
                    .map(|tx| (conn_id, tx.clone()))
            })
        };

        match target {
            Some(target) => self.deliver(vec![target], &event).await == 1,
            None => false,
        }
    }

    /// Deliver to every live session, optionally skipping one.
    pub async fn broadcast(&self, event: ServerEvent, except: Option<ConnectionId>) -> usize {
        let targets: Vec<_> = {
            let registry = self.inner.read().await;
            registry
                .channels
                .values()
                .flat_map(|connections| connections.iter())
                .filter(|(id, _)| Some(**id) != except)
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        self.deliver(targets, &event).await
    }

    pub async fn is_online(&self, user_id: i64) -> bool {
        self.inner.read().await.channels.contains_key(&user_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    async fn deliver(
        &self,
        targets: Vec<(ConnectionId, UnboundedSender<ServerEvent>)>,
        event: &ServerEvent,
    ) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (conn_id, tx) in targets {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(conn_id);
            }
        }

        if !dead.is_empty() {
            let mut registry = self.inner.write().await;
            for conn_id in dead {
                tracing::warn!(connection = %conn_id, "Pruning closed connection");
                registry.remove(conn_id);
            }
        }

        delivered
    }
}
