pub use handlers::{create_rating, delete_rating, get_rating, list_ratings, update_rating};
pub use models::{RatingModel, RatingSummary};

mod handlers;
pub mod models;
pub mod repository;
pub mod service;
