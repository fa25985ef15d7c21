use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Registry of open sockets plus the destinations they listen on
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(
        &self,
        connection_id: Uuid,
        user: String,
        sender: mpsc::UnboundedSender<String>,
    );

    /// Drops the connection and all of its subscriptions
    async fn remove_connection(&self, connection_id: Uuid);

    async fn subscribe(&self, connection_id: Uuid, topic: &str);

    async fn unsubscribe(&self, connection_id: Uuid, topic: &str);

    /// Delivers to every open connection of `user`
    async fn send_to_user(&self, user: &str, message: &str);

    /// Delivers to every connection subscribed to `topic`
    async fn publish(&self, topic: &str, message: &str);

    /// Delivers to a single connection, used for replies such as error frames
    async fn send_to_connection(&self, connection_id: Uuid, message: &str);
}

struct ConnectionEntry {
    user: String,
    sender: mpsc::UnboundedSender<String>,
    topics: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryConnectionManager {
    connections: Arc<RwLock<HashMap<Uuid, ConnectionEntry>>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(
        &self,
        connection_id: Uuid,
        user: String,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let mut connections = self.connections.write().await;
        connections.insert(
            connection_id,
            ConnectionEntry {
                user,
                sender,
                topics: HashSet::new(),
            },
        );
    }

    async fn remove_connection(&self, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        connections.remove(&connection_id);
    }

    async fn subscribe(&self, connection_id: Uuid, topic: &str) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(&connection_id) {
            entry.topics.insert(topic.to_string());
        }
    }

    async fn unsubscribe(&self, connection_id: Uuid, topic: &str) {
        let mut connections = self.connections.write().await;
        if let Some(entry) = connections.get_mut(&connection_id) {
            entry.topics.remove(topic);
        }
    }

    async fn send_to_user(&self, user: &str, message: &str) {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for entry in connections.values().filter(|entry| entry.user == user) {
            if entry.sender.send(message.to_string()).is_ok() {
                delivered += 1;
            }
        }
        debug!(user = %user, delivered, "Queued message for user");
    }

    async fn publish(&self, topic: &str, message: &str) {
        let connections = self.connections.read().await;
        for entry in connections.values().filter(|entry| entry.topics.contains(topic)) {
            let _ = entry.sender.send(message.to_string());
        }
    }

    async fn send_to_connection(&self, connection_id: Uuid, message: &str) {
        let connections = self.connections.read().await;
        if let Some(entry) = connections.get(&connection_id) {
            let _ = entry.sender.send(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect(
        manager: &InMemoryConnectionManager,
        user: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        manager.add_connection(id, user.to_string(), tx).await;
        (id, rx)
    }

    #[tokio::test]
    async fn test_user_queue_reaches_every_connection_of_that_user() {
        let manager = InMemoryConnectionManager::new();
        let (_, mut phone) = connect(&manager, "7").await;
        let (_, mut laptop) = connect(&manager, "7").await;
        let (_, mut other) = connect(&manager, "8").await;

        manager.send_to_user("7", "ring").await;

        assert_eq!(phone.recv().await.as_deref(), Some("ring"));
        assert_eq!(laptop.recv().await.as_deref(), Some("ring"));
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_topics_need_a_subscription() {
        let manager = InMemoryConnectionManager::new();
        let (listener, mut subscribed) = connect(&manager, "1").await;
        let (_, mut idle) = connect(&manager, "2").await;

        manager.subscribe(listener, "/topic/call-room/5").await;
        manager.publish("/topic/call-room/5", "offer").await;
        assert_eq!(subscribed.recv().await.as_deref(), Some("offer"));
        assert!(idle.try_recv().is_err());

        manager.unsubscribe(listener, "/topic/call-room/5").await;
        manager.publish("/topic/call-room/5", "answer").await;
        assert!(subscribed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_removed_connection_receives_nothing() {
        let manager = InMemoryConnectionManager::new();
        let (id, mut rx) = connect(&manager, "1").await;
        manager.subscribe(id, "/topic/notifications").await;

        manager.remove_connection(id).await;
        manager.send_to_user("1", "hello").await;
        manager.publish("/topic/notifications", "hello").await;

        // Sender was dropped with the entry, so the channel is closed and empty
        assert_eq!(rx.recv().await, None);
    }
}
