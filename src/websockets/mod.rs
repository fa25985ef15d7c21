// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::{websocket_handler, WebsocketReceiveHandler};
pub use messages::{
    call_room_topic, call_types, CallSignalMessage, ClientFrame, NotificationMessage,
    ServerFrame, CALL_QUEUE, NOTIFICATION_QUEUE, NOTIFICATION_TOPIC,
};
pub use relays::{CallSignalingRelay, NotificationRelay, RelayError};
pub use socket::{MessageHandler, SessionInfo};

// Internal modules
mod connection_manager;
mod handler;
mod messages;
mod relays;
mod socket;
