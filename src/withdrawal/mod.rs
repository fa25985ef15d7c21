pub use handlers::{
    create_withdrawal, delete_withdrawal, get_withdrawal, list_withdrawals, update_withdrawal,
};
pub use models::WithdrawalModel;

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
