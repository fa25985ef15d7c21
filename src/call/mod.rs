pub use handlers::{create_call, delete_call, get_call, list_calls, update_call};
pub use models::{CallModel, CallStatus};

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
