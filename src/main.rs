use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use morago::auth::start_purge_task;
use morago::config::AppConfig;
use morago::routes;
use morago::shared::{AppState, Repositories};
use morago::user::seed_test_user;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "morago=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    info!(environment = %config.environment, "Starting morago backend");

    let repositories = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Connected to PostgreSQL and applied migrations");
            Repositories::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory repositories");
            Repositories::in_memory()
        }
    };

    let app_state = AppState::from_config(repositories, &config);

    if config.seed_test_user {
        seed_test_user(&app_state.user_service()).await?;
    }

    tokio::spawn(start_purge_task(
        app_state.auth_service(),
        Duration::from_secs(config.refresh_token_purge_interval_secs),
    ));

    let app = routes::app(app_state).layer(routes::cors_layer(&config.cors_allowed_origins));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
