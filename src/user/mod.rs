// Public API - what other modules can use
pub use handlers::{create_user, delete_user, get_current_user, get_user, list_users, update_user};
pub use models::{Role, UserModel};
pub use seed::seed_test_user;

// Internal modules
pub mod account;
mod handlers;
pub mod models;
pub mod repository;
pub mod seed;
pub mod service;
pub mod types;
