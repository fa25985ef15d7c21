use serde_json::Value;
use uuid::Uuid;

use super::mocks::MockConnectionManager;

// ============================================================================
// Frame Assertions
// ============================================================================

/// Where a frame was delivered in the mock
pub enum Target<'a> {
    User(&'a str),
    Topic(&'a str),
    Connection(Uuid),
}

pub struct FrameAssertion {
    frames: Vec<Value>,
    target: String,
}

impl FrameAssertion {
    pub async fn at(manager: &MockConnectionManager, target: Target<'_>) -> Self {
        let (raw, label) = match target {
            Target::User(user) => (manager.messages_for_user(user).await, format!("user {}", user)),
            Target::Topic(topic) => (manager.messages_on_topic(topic).await, format!("topic {}", topic)),
            Target::Connection(id) => (
                manager.messages_for_connection(id).await,
                format!("connection {}", id),
            ),
        };
        let frames = raw
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("frame should be JSON"))
            .collect();
        Self {
            frames,
            target: label,
        }
    }

    pub fn received_nothing(&self) {
        assert!(
            self.frames.is_empty(),
            "expected no frames for {}, got {:?}",
            self.target,
            self.frames
        );
    }

    pub fn count(&self, expected: usize) -> &Self {
        assert_eq!(
            self.frames.len(),
            expected,
            "unexpected frame count for {}: {:?}",
            self.target,
            self.frames
        );
        self
    }

    /// Payload of the last MESSAGE frame, checking its destination
    pub fn last_message(&self, destination: &str) -> Value {
        let frame = self
            .frames
            .last()
            .unwrap_or_else(|| panic!("no frames for {}", self.target));
        assert_eq!(frame["command"], "MESSAGE", "frame: {}", frame);
        assert_eq!(frame["destination"], destination, "frame: {}", frame);
        frame["payload"].clone()
    }

    /// Message text of the last ERROR frame
    pub fn last_error(&self) -> String {
        let frame = self
            .frames
            .last()
            .unwrap_or_else(|| panic!("no frames for {}", self.target));
        assert_eq!(frame["command"], "ERROR", "frame: {}", frame);
        frame["message"].as_str().unwrap_or_default().to_string()
    }
}
