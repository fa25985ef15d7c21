pub use handlers::{
    create_user_profile, delete_user_profile, get_user_profile, list_user_profiles,
    update_user_profile,
};
pub use models::UserProfileModel;

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
