use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, instrument};

use super::service::AuthService;

/// Periodically deletes refresh tokens whose expiry has passed.
/// A zero interval disables the task and returns immediately.
#[instrument(skip(service))]
pub async fn start_purge_task(service: AuthService, purge_interval: Duration) {
    if purge_interval.is_zero() {
        info!("Refresh token purge disabled");
        return;
    }

    info!(
        purge_interval_secs = purge_interval.as_secs(),
        "Starting refresh token purge task"
    );

    let mut ticker = interval(purge_interval);

    loop {
        ticker.tick().await;

        match service.purge_expired().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Expired refresh tokens purged"),
            Err(e) => error!(error = %e, "Refresh token purge failed"),
        }
    }
}
