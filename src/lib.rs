// Library crate for the morago backend
// This file exposes the public API for the binary and integration tests

pub mod auth;
pub mod call;
pub mod catalog;
pub mod config;
pub mod deposit;
pub mod pagination;
pub mod rating;
pub mod routes;
pub mod shared;
pub mod transfer;
pub mod translator_profile;
pub mod user;
pub mod user_profile;
pub mod validation;
pub mod websockets;
pub mod withdrawal;

// Re-export commonly used types for easier access in tests
pub use auth::Principal;
pub use shared::{AppError, AppState, Repositories};
pub use websockets::{
    CallSignalingRelay, ConnectionManager, InMemoryConnectionManager, MessageHandler,
    NotificationRelay, WebsocketReceiveHandler,
};
