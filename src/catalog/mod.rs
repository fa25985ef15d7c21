pub use handlers::{create_language, create_theme, list_languages, list_themes};
pub use models::{CatalogItem, CatalogKind};

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
