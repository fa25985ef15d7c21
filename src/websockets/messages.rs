use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Per-user queue for call signaling
pub const CALL_QUEUE: &str = "/user/queue/calls";
/// Per-user queue for notifications
pub const NOTIFICATION_QUEUE: &str = "/user/queue/notifications";
/// Broadcast topic for notifications without a recipient
pub const NOTIFICATION_TOPIC: &str = "/topic/notifications";

const CALL_ROOM_PREFIX: &str = "/topic/call-room/";

/// Topic shared by everyone taking part in a call
pub fn call_room_topic(call_id: &str) -> String {
    format!("{}{}", CALL_ROOM_PREFIX, call_id)
}

/// Frames sent by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    Subscribe {
        destination: String,
    },
    Unsubscribe {
        destination: String,
    },
    Send {
        destination: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Frames sent to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    Message { destination: String, payload: Value },
    Error { message: String },
}

impl ServerFrame {
    pub fn message<T: Serialize>(destination: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(ServerFrame::Message {
            destination: destination.to_string(),
            payload: serde_json::to_value(payload)?,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Type tags stamped on relayed call messages
pub mod call_types {
    pub const INITIATE: &str = "CALL_INITIATE";
    pub const ACCEPTED: &str = "CALL_ACCEPTED";
    pub const REJECTED: &str = "CALL_REJECTED";
    pub const ENDED: &str = "CALL_ENDED";
    pub const TRANSLATOR_JOINED: &str = "TRANSLATOR_JOINED";
}

/// Payload of every `/app/call.*` message.
/// Ids are opaque strings; clients may send them as JSON numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallSignalMessage {
    #[serde(default, deserialize_with = "lenient_id")]
    pub call_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub caller_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub recipient_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub translator_id: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub channel_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub theme_id: Option<String>,
    /// SDP offers/answers and ICE candidates travel here untouched
    pub data: Option<Value>,
    pub status: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Payload of `/app/notification.send` and of programmatic notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub recipient_id: Option<String>,
    pub sender: Option<String>,
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub data: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}
