pub use handlers::{create_deposit, delete_deposit, get_deposit, list_deposits, update_deposit};
pub use models::DepositModel;

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
