use tracing::{info, instrument};

use super::{service::UserService, types::CreateUserRequest};
use crate::shared::AppError;

pub const TEST_ADMIN_USERNAME: &str = "01012345673";
pub const TEST_ADMIN_PASSWORD: &str = "123456";

/// Creates the development admin account unless it already exists.
/// Returns whether a user was created.
#[instrument(skip(service))]
pub async fn seed_test_user(service: &UserService) -> Result<bool, AppError> {
    match service.get_by_username(TEST_ADMIN_USERNAME).await {
        Ok(_) => {
            info!("Test admin user already present");
            Ok(false)
        }
        Err(AppError::NotFound(_)) => {
            service
                .create_user(CreateUserRequest {
                    username: Some(TEST_ADMIN_USERNAME.to_string()),
                    password: Some(TEST_ADMIN_PASSWORD.to_string()),
                    first_name: Some("Test".to_string()),
                    last_name: Some("Admin".to_string()),
                    roles: Some(vec!["ROLE_ADMIN".to_string()]),
                    ..Default::default()
                })
                .await?;
            info!(username = TEST_ADMIN_USERNAME, "Seeded test admin user");
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use crate::user::models::Role;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let state = AppStateBuilder::new().build();
        let service = state.user_service();

        assert!(seed_test_user(&service).await.unwrap());
        assert!(!seed_test_user(&service).await.unwrap());

        let admin = service.get_by_username(TEST_ADMIN_USERNAME).await.unwrap();
        assert_eq!(admin.roles, vec![Role::Admin]);
    }
}
