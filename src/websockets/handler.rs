use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::connection_manager::ConnectionManager;
use super::messages::{CallSignalMessage, ClientFrame, NotificationMessage, ServerFrame};
use super::relays::{CallSignalingRelay, NotificationRelay, RelayError};
use super::socket::{Connection, MessageHandler, SessionInfo};
use crate::auth::authenticate_token;
use crate::shared::{AppError, AppState};

const APP_PREFIX: &str = "/app";
const TOPIC_PREFIX: &str = "/topic/";
const SIGNAL_PREFIX: &str = "/app/call.signal/";

/// Routes inbound frames: subscriptions go to the connection manager,
/// `SEND` frames go to the relay that owns their destination
pub struct WebsocketReceiveHandler {
    connections: Arc<dyn ConnectionManager>,
    calls: CallSignalingRelay,
    notifications: NotificationRelay,
}

impl WebsocketReceiveHandler {
    pub fn new(
        connections: Arc<dyn ConnectionManager>,
        calls: CallSignalingRelay,
        notifications: NotificationRelay,
    ) -> Self {
        Self {
            connections,
            calls,
            notifications,
        }
    }

    async fn reply_error(&self, session: &SessionInfo, message: String) {
        match ServerFrame::error(message).to_json() {
            Ok(frame) => {
                self.connections
                    .send_to_connection(session.connection_id, &frame)
                    .await
            }
            Err(e) => warn!(error = %e, "Failed to encode error frame"),
        }
    }

    async fn route_send(
        &self,
        session: &SessionInfo,
        destination: &str,
        payload: Value,
    ) -> Result<(), String> {
        let user = Some(session.user.as_str());

        if let Some(call_id) = destination.strip_prefix(SIGNAL_PREFIX) {
            if call_id.is_empty() {
                return Err("Missing call id in destination".to_string());
            }
            let message = parse_call(payload)?;
            return self
                .calls
                .signal(call_id, message)
                .await
                .map(|_| ())
                .map_err(relay_error);
        }

        let action = destination
            .strip_prefix(APP_PREFIX)
            .ok_or_else(|| format!("Unknown destination: {}", destination))?;

        let outcome = match action {
            "/call.initiate" => self.calls.initiate(user, parse_call(payload)?).await.map(|_| ()),
            "/call.accept" => self.calls.accept(parse_call(payload)?).await.map(|_| ()),
            "/call.reject" => self.calls.reject(parse_call(payload)?).await.map(|_| ()),
            "/call.end" => self.calls.end(parse_call(payload)?).await.map(|_| ()),
            "/call.translator.join" => self
                .calls
                .translator_join(user, parse_call(payload)?)
                .await
                .map(|_| ()),
            "/notification.send" => {
                let message: NotificationMessage = serde_json::from_value(payload)
                    .map_err(|e| format!("Invalid notification payload: {}", e))?;
                self.notifications.send(user, message).await.map(|_| ())
            }
            _ => return Err(format!("Unknown destination: {}", destination)),
        };
        outcome.map_err(relay_error)
    }
}

fn parse_call(payload: Value) -> Result<CallSignalMessage, String> {
    serde_json::from_value(payload).map_err(|e| format!("Invalid call payload: {}", e))
}

fn relay_error(e: RelayError) -> String {
    e.to_string()
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, session: &SessionInfo, message: String) {
        let frame = match serde_json::from_str::<ClientFrame>(&message) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(user = %session.user, error = %e, "Failed to parse WebSocket frame");
                self.reply_error(session, format!("Malformed frame: {}", e))
                    .await;
                return;
            }
        };

        match frame {
            ClientFrame::Subscribe { destination } => {
                if destination.starts_with(TOPIC_PREFIX) {
                    self.connections
                        .subscribe(session.connection_id, &destination)
                        .await;
                    debug!(user = %session.user, destination = %destination, "Subscribed");
                } else if !destination.starts_with("/user/queue/") {
                    self.reply_error(session, format!("Cannot subscribe to {}", destination))
                        .await;
                }
            }
            ClientFrame::Unsubscribe { destination } => {
                self.connections
                    .unsubscribe(session.connection_id, &destination)
                    .await;
            }
            ClientFrame::Send {
                destination,
                payload,
            } => {
                if let Err(reason) = self.route_send(session, &destination, payload).await {
                    warn!(
                        user = %session.user,
                        destination = %destination,
                        reason = %reason,
                        "Rejected WebSocket message"
                    );
                    self.reply_error(session, reason).await;
                }
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WebSocketQuery {
    pub token: Option<String>,
}

/// Access token from the `Sec-WebSocket-Protocol` header (last listed value)
fn protocol_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| raw.split(',').map(str::trim).filter(|p| !p.is_empty()).last())
        .map(str::to_string)
}

/// GET /ws
///
/// The access token travels in `Sec-WebSocket-Protocol` (browsers cannot set
/// an Authorization header on upgrade) or in `?token=`.
#[instrument(name = "websocket_handler", skip_all)]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    Query(query): Query<WebSocketQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let from_protocol = protocol_token(&headers);
    let token = from_protocol
        .clone()
        .or(query.token)
        .ok_or_else(|| {
            warn!("WebSocket upgrade without access token");
            AppError::Unauthorized("Missing authentication token".to_string())
        })?;

    let principal = authenticate_token(&state, &token)?;
    info!(user_id = principal.user_id, "WebSocket authentication successful");

    let ws = match from_protocol {
        // Echo the protocol back so the client accepts the handshake
        Some(protocol) => ws.protocols([protocol]),
        None => ws,
    };

    let session = SessionInfo {
        connection_id: Uuid::new_v4(),
        user: principal.user_id.to_string(),
        username: principal.username,
    };
    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, session, state)))
}

async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    session: SessionInfo,
    state: AppState,
) {
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    state
        .connection_manager
        .add_connection(session.connection_id, session.user.clone(), outbound_sender)
        .await;
    info!(
        user = %session.user,
        connection_id = %session.connection_id,
        "WebSocket connection established"
    );

    let message_handler = Arc::new(WebsocketReceiveHandler::new(
        Arc::clone(&state.connection_manager),
        state.call_signaling_relay(),
        state.notification_relay(),
    ));
    let connection_id = session.connection_id;
    let user = session.user.clone();

    match Connection::new(session, Box::new(socket), outbound_receiver, message_handler)
        .run()
        .await
    {
        Ok(()) => info!(user = %user, "WebSocket connection closed cleanly"),
        Err(e) => warn!(user = %user, error = ?e, "WebSocket connection error"),
    }

    state.connection_manager.remove_connection(connection_id).await;
}
