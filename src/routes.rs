use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::shared::AppState;
use crate::{
    auth, call, catalog, deposit, rating, translator_profile, user, user_profile, websockets,
    withdrawal,
};

/// Full HTTP surface. Every route passes through the access table in
/// `auth::authorize`; public routes are let through there.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websockets::websocket_handler))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh_token", post(auth::refresh_token))
        .route("/auth/logout", post(auth::logout))
        .route("/api/users", get(user::list_users).post(user::create_user))
        .route("/api/users/me", get(user::get_current_user))
        .route(
            "/api/users/:id",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .route(
            "/api/translator-profiles",
            get(translator_profile::search_translator_profiles)
                .post(translator_profile::create_translator_profile),
        )
        .route(
            "/api/translator-profiles/available/theme/:theme_id",
            get(translator_profile::available_by_theme),
        )
        .route(
            "/api/translator-profiles/:id",
            get(translator_profile::get_translator_profile)
                .put(translator_profile::update_translator_profile)
                .delete(translator_profile::delete_translator_profile),
        )
        .route(
            "/api/translator-profiles/:id/availability",
            patch(translator_profile::update_availability),
        )
        .route(
            "/api/translator-profiles/:id/online-status",
            patch(translator_profile::update_online_status),
        )
        .route(
            "/api/user-profiles",
            get(user_profile::list_user_profiles).post(user_profile::create_user_profile),
        )
        .route(
            "/api/user-profiles/:id",
            get(user_profile::get_user_profile)
                .put(user_profile::update_user_profile)
                .delete(user_profile::delete_user_profile),
        )
        .route(
            "/api/deposits",
            get(deposit::list_deposits).post(deposit::create_deposit),
        )
        .route(
            "/api/deposits/:id",
            get(deposit::get_deposit)
                .put(deposit::update_deposit)
                .delete(deposit::delete_deposit),
        )
        .route(
            "/api/withdrawals",
            get(withdrawal::list_withdrawals).post(withdrawal::create_withdrawal),
        )
        .route(
            "/api/withdrawals/:id",
            get(withdrawal::get_withdrawal)
                .put(withdrawal::update_withdrawal)
                .delete(withdrawal::delete_withdrawal),
        )
        .route(
            "/api/ratings",
            get(rating::list_ratings).post(rating::create_rating),
        )
        .route(
            "/api/ratings/:id",
            get(rating::get_rating)
                .put(rating::update_rating)
                .delete(rating::delete_rating),
        )
        .route("/api/calls", get(call::list_calls).post(call::create_call))
        .route(
            "/api/calls/:id",
            get(call::get_call)
                .put(call::update_call)
                .delete(call::delete_call),
        )
        .route(
            "/api/languages",
            get(catalog::list_languages).post(catalog::create_language),
        )
        .route(
            "/api/themes",
            get(catalog::list_themes).post(catalog::create_theme),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authorize,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the configured origins; any origin when none are configured
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(origins)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}
