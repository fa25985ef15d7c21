use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use morago::websockets::ConnectionManager;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every delivery instead of writing to sockets
#[derive(Clone, Default)]
pub struct MockConnectionManager {
    users: Arc<RwLock<HashMap<Uuid, String>>>,
    subscriptions: Arc<RwLock<HashMap<Uuid, HashSet<String>>>>,
    user_messages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    topic_messages: Arc<RwLock<HashMap<String, Vec<String>>>>,
    connection_messages: Arc<RwLock<HashMap<Uuid, Vec<String>>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages_for_user(&self, user: &str) -> Vec<String> {
        self.user_messages
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn messages_on_topic(&self, topic: &str) -> Vec<String> {
        self.topic_messages
            .read()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn messages_for_connection(&self, connection_id: Uuid) -> Vec<String> {
        self.connection_messages
            .read()
            .await
            .get(&connection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn subscriptions_of(&self, connection_id: Uuid) -> HashSet<String> {
        self.subscriptions
            .read()
            .await
            .get(&connection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn is_connected(&self, connection_id: Uuid) -> bool {
        self.users.read().await.contains_key(&connection_id)
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(
        &self,
        connection_id: Uuid,
        user: String,
        _sender: mpsc::UnboundedSender<String>,
    ) {
        self.users.write().await.insert(connection_id, user);
    }

    async fn remove_connection(&self, connection_id: Uuid) {
        self.users.write().await.remove(&connection_id);
        self.subscriptions.write().await.remove(&connection_id);
    }

    async fn subscribe(&self, connection_id: Uuid, topic: &str) {
        self.subscriptions
            .write()
            .await
            .entry(connection_id)
            .or_default()
            .insert(topic.to_string());
    }

    async fn unsubscribe(&self, connection_id: Uuid, topic: &str) {
        if let Some(topics) = self.subscriptions.write().await.get_mut(&connection_id) {
            topics.remove(topic);
        }
    }

    async fn send_to_user(&self, user: &str, message: &str) {
        self.user_messages
            .write()
            .await
            .entry(user.to_string())
            .or_default()
            .push(message.to_string());
    }

    async fn publish(&self, topic: &str, message: &str) {
        self.topic_messages
            .write()
            .await
            .entry(topic.to_string())
            .or_default()
            .push(message.to_string());
    }

    async fn send_to_connection(&self, connection_id: Uuid, message: &str) {
        self.connection_messages
            .write()
            .await
            .entry(connection_id)
            .or_default()
            .push(message.to_string());
    }
}
