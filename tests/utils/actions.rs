use serde_json::{json, Value};

use morago::websockets::{MessageHandler, SessionInfo};

use super::setup::SignalingSetup;

// ============================================================================
// Client Frame Actions
// ============================================================================

impl SignalingSetup {
    pub async fn send_frame(&self, session: &SessionInfo, frame: Value) {
        self.input_handler
            .handle_message(session, frame.to_string())
            .await;
    }

    pub async fn send_raw(&self, session: &SessionInfo, raw: &str) {
        self.input_handler
            .handle_message(session, raw.to_string())
            .await;
    }

    pub async fn send(&self, session: &SessionInfo, destination: &str, payload: Value) {
        self.send_frame(
            session,
            json!({ "command": "SEND", "destination": destination, "payload": payload }),
        )
        .await;
    }

    pub async fn subscribe(&self, session: &SessionInfo, destination: &str) {
        self.send_frame(
            session,
            json!({ "command": "SUBSCRIBE", "destination": destination }),
        )
        .await;
    }

    pub async fn unsubscribe(&self, session: &SessionInfo, destination: &str) {
        self.send_frame(
            session,
            json!({ "command": "UNSUBSCRIBE", "destination": destination }),
        )
        .await;
    }

    pub async fn initiate_call(&self, caller: &SessionInfo, recipient_id: i64, call_id: i64) {
        self.send(
            caller,
            "/app/call.initiate",
            json!({ "callId": call_id, "recipientId": recipient_id, "channelName": format!("call-{}", call_id) }),
        )
        .await;
    }
}
