// Public API - what other modules can use
pub use handlers::{login, logout, refresh_token};
pub use middleware::{authenticate_token, authorize};
pub use purge::start_purge_task;
pub use types::{Principal, TokenKind};

// Internal modules
mod handlers;
mod middleware;
pub mod models;
pub mod password;
pub mod policy;
mod purge;
pub mod repository;
pub mod service;
pub mod token;
pub mod types;
