// Public API - what other modules can use
pub use handlers::{
    available_by_theme, create_translator_profile, delete_translator_profile,
    get_translator_profile, search_translator_profiles, update_availability,
    update_online_status, update_translator_profile,
};
pub use models::{TranslatorFilter, TranslatorProfileModel};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
