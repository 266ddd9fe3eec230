use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod handlers;
pub mod message_types;
pub mod pubsub;

/// Per-user rooms: user_id -> live socket senders. A user with several open
/// tabs holds several senders; pushing to a user fans out to all of them.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Vec<UnboundedSender<Message>>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`; the returned receiver drains
    /// everything pushed at that user's room.
    pub async fn join(&self, user_id: Uuid) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        self.inner.write().await.entry(user_id).or_default().push(tx);
        rx
    }

    /// Deliver to every live connection of `user_id`, pruning dead senders.
    /// A user with no connections is a silent no-op (best-effort push).
    pub async fn push(&self, user_id: Uuid, msg: Message) {
        let mut guard = self.inner.write().await;
        if let Some(list) = guard.get_mut(&user_id) {
            list.retain(|sender| sender.send(msg.clone()).is_ok());
            if list.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .get(&user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub async fn connected_users_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_registers_connection() {
        let registry = RoomRegistry::new();
        let user_id = Uuid::new_v4();
        let _rx = registry.join(user_id).await;
        assert_eq!(registry.connection_count(user_id).await, 1);
        assert_eq!(registry.connected_users_count().await, 1);
    }

    #[tokio::test]
    async fn test_push_reaches_all_connections_of_user() {
        let registry = RoomRegistry::new();
        let user_id = Uuid::new_v4();
        let mut rx1 = registry.join(user_id).await;
        let mut rx2 = registry.join(user_id).await;

        registry.push(user_id, Message::Text("hello".into())).await;

        assert_eq!(rx1.recv().await.unwrap(), Message::Text("hello".into()));
        assert_eq!(rx2.recv().await.unwrap(), Message::Text("hello".into()));
    }

    #[tokio::test]
    async fn test_push_to_offline_user_is_noop() {
        let registry = RoomRegistry::new();
        // Must not error or panic; the recipient simply is not connected.
        registry.push(Uuid::new_v4(), Message::Text("hi".into())).await;
    }

    #[tokio::test]
    async fn test_push_does_not_leak_across_rooms() {
        let registry = RoomRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = registry.join(a).await;
        let _rx_b = registry.join(b).await;

        registry.push(a, Message::Text("for a".into())).await;

        assert_eq!(rx_a.recv().await.unwrap(), Message::Text("for a".into()));
        assert_eq!(registry.connection_count(b).await, 1);
    }

    #[tokio::test]
    async fn test_dead_connections_are_pruned() {
        let registry = RoomRegistry::new();
        let user_id = Uuid::new_v4();
        let rx = registry.join(user_id).await;
        drop(rx);

        registry.push(user_id, Message::Text("gone".into())).await;
        assert_eq!(registry.connection_count(user_id).await, 0);
    }
}
