use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use morago::auth::password::PasswordService;
use morago::auth::token::TokenCodec;
use morago::config::JwtSettings;
use morago::routes;
use morago::shared::{AppState, Repositories};
use morago::user::seed::{seed_test_user, TEST_ADMIN_PASSWORD, TEST_ADMIN_USERNAME};
use morago::websockets::{ConnectionManager, InMemoryConnectionManager, SessionInfo, WebsocketReceiveHandler};

use super::mocks::MockConnectionManager;

pub const USER_PASSWORD: &str = "password-123";

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret".to_string(),
        refresh_secret: "integration-refresh-secret".to_string(),
        access_expiration_secs: 900,
        refresh_expiration_secs: 3600,
    }
}

fn build_state(connection_manager: Arc<dyn ConnectionManager>) -> AppState {
    AppState::new(
        Repositories::in_memory(),
        Arc::new(TokenCodec::new(&test_jwt_settings())),
        Arc::new(PasswordService::with_cost(8, 1).unwrap()),
        connection_manager,
    )
}

// ============================================================================
// HTTP Test Setup
// ============================================================================

/// In-memory application driven through the router with `oneshot`
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_connection_manager(Arc::new(InMemoryConnectionManager::new())).await
    }

    pub async fn with_connection_manager(manager: Arc<dyn ConnectionManager>) -> Self {
        let state = build_state(manager);
        seed_test_user(&state.user_service()).await.unwrap();
        let router = routes::app(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), None).await
    }

    /// Returns the `{accessToken, refreshToken}` body
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/auth/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    pub async fn access_token(&self, username: &str, password: &str) -> String {
        let response = self.login(username, password).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["accessToken"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.access_token(TEST_ADMIN_USERNAME, TEST_ADMIN_PASSWORD).await
    }

    /// Creates an account through the admin API and returns its JSON
    pub async fn create_user(&self, admin_token: &str, username: &str, roles: &[&str]) -> Value {
        let response = self
            .post(
                "/api/users",
                Some(admin_token),
                json!({
                    "username": username,
                    "password": USER_PASSWORD,
                    "firstName": "Test",
                    "lastName": "User",
                    "roles": roles,
                }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "user creation failed: {}",
            response.body
        );
        response.body
    }
}

// ============================================================================
// Signaling Test Setup
// ============================================================================

/// Receive handler wired to a recording connection manager
pub struct SignalingSetup {
    pub state: AppState,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub input_handler: WebsocketReceiveHandler,
}

impl SignalingSetup {
    pub fn new() -> Self {
        let mock_conn_manager = Arc::new(MockConnectionManager::new());
        let state = build_state(mock_conn_manager.clone());
        let input_handler = WebsocketReceiveHandler::new(
            mock_conn_manager.clone(),
            state.call_signaling_relay(),
            state.notification_relay(),
        );
        Self {
            state,
            mock_conn_manager,
            input_handler,
        }
    }

    /// Registers a connection for the given user id
    pub async fn connect(&self, user_id: i64) -> SessionInfo {
        let (sender, _receiver) = mpsc::unbounded_channel();
        let session = SessionInfo {
            connection_id: Uuid::new_v4(),
            user: user_id.to_string(),
            username: format!("0101000{:04}", user_id),
        };
        self.mock_conn_manager
            .add_connection(session.connection_id, session.user.clone(), sender)
            .await;
        session
    }
}
