use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::connection_manager::ConnectionManager;
use super::messages::{
    call_room_topic, call_types, CallSignalMessage, NotificationMessage, ServerFrame, CALL_QUEUE,
    NOTIFICATION_QUEUE, NOTIFICATION_TOPIC,
};

const SYSTEM_SENDER: &str = "System";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Could not encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RelayError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RelayError::MissingField(field))
}

/// Rebuilds an inbound call message with a fresh type tag and timestamp
fn restamp(original: &CallSignalMessage, message_type: &str) -> CallSignalMessage {
    CallSignalMessage {
        message_type: Some(message_type.to_string()),
        timestamp: Some(Utc::now()),
        ..original.clone()
    }
}

/// Forwards call signaling between the two parties of a call and its room topic
pub struct CallSignalingRelay {
    connections: Arc<dyn ConnectionManager>,
}

impl CallSignalingRelay {
    pub fn new(connections: Arc<dyn ConnectionManager>) -> Self {
        Self { connections }
    }

    async fn to_user(
        &self,
        user: &str,
        destination: &str,
        message: &CallSignalMessage,
    ) -> Result<(), RelayError> {
        let frame = ServerFrame::message(destination, message)?.to_json()?;
        self.connections.send_to_user(user, &frame).await;
        Ok(())
    }

    async fn to_room(&self, call_id: &str, message: &CallSignalMessage) -> Result<(), RelayError> {
        let topic = call_room_topic(call_id);
        let frame = ServerFrame::message(&topic, message)?.to_json()?;
        self.connections.publish(&topic, &frame).await;
        Ok(())
    }

    /// `/app/call.initiate`: rings the recipient
    pub async fn initiate(
        &self,
        session_user: Option<&str>,
        message: CallSignalMessage,
    ) -> Result<CallSignalMessage, RelayError> {
        let recipient = required(&message.recipient_id, "recipientId")?.to_string();
        let mut outbound = restamp(&message, call_types::INITIATE);
        if let Some(user) = session_user {
            outbound.caller_id = Some(user.to_string());
        }

        info!(
            caller = ?outbound.caller_id,
            recipient = %recipient,
            call_id = ?outbound.call_id,
            "Call initiated"
        );
        self.to_user(&recipient, CALL_QUEUE, &outbound).await?;
        Ok(outbound)
    }

    /// `/app/call.accept`: tells the caller and opens the call room
    pub async fn accept(&self, message: CallSignalMessage) -> Result<CallSignalMessage, RelayError> {
        let caller = required(&message.caller_id, "callerId")?;
        let call_id = required(&message.call_id, "callId")?;
        let outbound = restamp(&message, call_types::ACCEPTED);

        info!(call_id = %call_id, recipient = ?message.recipient_id, "Call accepted");
        self.to_user(caller, CALL_QUEUE, &outbound).await?;
        self.to_room(call_id, &outbound).await?;
        Ok(outbound)
    }

    /// `/app/call.reject`: tells the caller only
    pub async fn reject(&self, message: CallSignalMessage) -> Result<CallSignalMessage, RelayError> {
        let caller = required(&message.caller_id, "callerId")?;
        let outbound = restamp(&message, call_types::REJECTED);

        info!(call_id = ?message.call_id, recipient = ?message.recipient_id, "Call rejected");
        self.to_user(caller, CALL_QUEUE, &outbound).await?;
        Ok(outbound)
    }

    /// `/app/call.end`
    pub async fn end(&self, message: CallSignalMessage) -> Result<CallSignalMessage, RelayError> {
        let call_id = required(&message.call_id, "callId")?;
        let outbound = restamp(&message, call_types::ENDED);

        info!(call_id = %call_id, "Call ended");
        self.to_room(call_id, &outbound).await?;
        Ok(outbound)
    }

    /// `/app/call.signal/{callId}`: WebRTC offers, answers and ICE candidates.
    /// The client's type tag is kept; the call id comes from the destination.
    pub async fn signal(
        &self,
        call_id: &str,
        message: CallSignalMessage,
    ) -> Result<CallSignalMessage, RelayError> {
        let outbound = CallSignalMessage {
            call_id: Some(call_id.to_string()),
            timestamp: Some(Utc::now()),
            ..message
        };

        debug!(call_id = %call_id, signal_type = ?outbound.message_type, "Relaying WebRTC signal");
        self.to_room(call_id, &outbound).await?;
        Ok(outbound)
    }

    /// `/app/call.translator.join`
    pub async fn translator_join(
        &self,
        session_user: Option<&str>,
        message: CallSignalMessage,
    ) -> Result<CallSignalMessage, RelayError> {
        let call_id = required(&message.call_id, "callId")?.to_string();
        let mut outbound = restamp(&message, call_types::TRANSLATOR_JOINED);
        if let Some(user) = session_user {
            outbound.translator_id = Some(user.to_string());
        }

        info!(call_id = %call_id, translator = ?outbound.translator_id, "Translator joined call");
        self.to_room(&call_id, &outbound).await?;
        Ok(outbound)
    }
}

/// Delivers notifications to one user's queue or to the broadcast topic
pub struct NotificationRelay {
    connections: Arc<dyn ConnectionManager>,
}

impl NotificationRelay {
    pub fn new(connections: Arc<dyn ConnectionManager>) -> Self {
        Self { connections }
    }

    fn prepare(original: NotificationMessage, sender: &str) -> NotificationMessage {
        NotificationMessage {
            id: original.id.or_else(|| Some(Uuid::new_v4().to_string())),
            sender: Some(sender.to_string()),
            timestamp: Some(Utc::now()),
            ..original
        }
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<(), RelayError> {
        match message.recipient_id.as_deref().map(str::trim) {
            Some(recipient) if !recipient.is_empty() => {
                let frame = ServerFrame::message(NOTIFICATION_QUEUE, message)?.to_json()?;
                self.connections.send_to_user(recipient, &frame).await;
                info!(recipient = %recipient, title = ?message.title, "Notification sent to user");
            }
            _ => {
                let frame = ServerFrame::message(NOTIFICATION_TOPIC, message)?.to_json()?;
                self.connections.publish(NOTIFICATION_TOPIC, &frame).await;
                info!(title = ?message.title, "Notification broadcast");
            }
        }
        Ok(())
    }

    /// `/app/notification.send`: the sender is the session user, or "System" without one
    pub async fn send(
        &self,
        session_user: Option<&str>,
        message: NotificationMessage,
    ) -> Result<NotificationMessage, RelayError> {
        let prepared = Self::prepare(message, session_user.unwrap_or(SYSTEM_SENDER));
        self.deliver(&prepared).await?;
        Ok(prepared)
    }

    pub async fn send_notification_to_user(
        &self,
        user: &str,
        title: &str,
        text: &str,
        notification_type: &str,
        data: Option<Value>,
    ) -> Result<NotificationMessage, RelayError> {
        let prepared = Self::prepare(
            NotificationMessage {
                title: Some(title.to_string()),
                text: Some(text.to_string()),
                recipient_id: Some(user.to_string()),
                notification_type: Some(notification_type.to_string()),
                data,
                ..Default::default()
            },
            SYSTEM_SENDER,
        );
        self.deliver(&prepared).await?;
        Ok(prepared)
    }

    pub async fn broadcast_notification(
        &self,
        title: &str,
        text: &str,
        notification_type: &str,
        data: Option<Value>,
    ) -> Result<NotificationMessage, RelayError> {
        let prepared = Self::prepare(
            NotificationMessage {
                title: Some(title.to_string()),
                text: Some(text.to_string()),
                notification_type: Some(notification_type.to_string()),
                data,
                ..Default::default()
            },
            SYSTEM_SENDER,
        );
        self.deliver(&prepared).await?;
        Ok(prepared)
    }
}
