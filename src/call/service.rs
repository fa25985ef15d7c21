use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{CallModel, CallRequest, CallResponse, NewCall};
use super::repository::CallRepository;
use crate::catalog::models::CatalogKind;
use crate::catalog::repository::CatalogRepository;
use crate::catalog::service::require_all;
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;
use crate::user::repository::UserRepository;
use crate::validation::{ensure_valid, Validate, Violations};

pub struct CallService {
    calls: Arc<dyn CallRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
}

impl CallService {
    pub fn new(
        calls: Arc<dyn CallRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
    ) -> Self {
        Self {
            calls,
            users,
            catalog,
        }
    }

    async fn require_user(&self, user_id: i64) -> Result<(), AppError> {
        match self.users.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User not found with id {}", user_id))),
        }
    }

    async fn require_theme(&self, theme_id: Option<i64>) -> Result<(), AppError> {
        match theme_id {
            Some(id) => require_all(self.catalog.as_ref(), CatalogKind::Theme, &[id]).await,
            None => Ok(()),
        }
    }

    async fn find(&self, id: i64) -> Result<CallModel, AppError> {
        self.calls
            .get_call(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Call not found with id {}", id)))
    }

    /// Opens a call record from `caller_id` to the requested recipient
    #[instrument(skip(self, request))]
    pub async fn create_call(
        &self,
        caller_id: i64,
        request: CallRequest,
    ) -> Result<CallResponse, AppError> {
        let mut v = Violations::new();
        v.required("recipientId", request.recipient_id.as_ref());
        let mut errors = v.into_errors();
        errors.extend(request.validate());
        if !errors.is_empty() {
            return Err(AppError::ValidationFailed(errors));
        }

        let recipient_id = request.recipient_id.unwrap_or_default();
        if recipient_id == caller_id {
            return Err(AppError::BadRequest(
                "Caller and recipient must be different users".to_string(),
            ));
        }
        self.require_user(caller_id).await?;
        self.require_user(recipient_id).await?;
        self.require_theme(request.theme_id).await?;

        let defaults = NewCall::between(caller_id, recipient_id);
        let call = self
            .calls
            .create_call(&NewCall {
                theme_id: request.theme_id,
                duration: request.duration.unwrap_or(defaults.duration),
                status: request.status.unwrap_or(defaults.status),
                sum_decimal: request.sum_decimal,
                commission: request.commission,
                translator_has_joined: request
                    .translator_has_joined
                    .unwrap_or(defaults.translator_has_joined),
                user_has_rated: request.user_has_rated.unwrap_or(defaults.user_has_rated),
                channel_name: request.channel_name,
                call_status: request.call_status.unwrap_or(defaults.call_status),
                is_end_call: request.is_end_call.unwrap_or(defaults.is_end_call),
                ..defaults
            })
            .await?;
        info!(call_id = call.id, caller_id, recipient_id, "Call created");
        Ok(call.into())
    }

    pub async fn get_call(&self, id: i64) -> Result<CallResponse, AppError> {
        Ok(self.find(id).await?.into())
    }

    pub async fn list_calls(&self, page: PageRequest) -> Result<Page<CallResponse>, AppError> {
        Ok(self.calls.list_calls(page).await?.map(CallResponse::from))
    }

    #[instrument(skip(self, request))]
    pub async fn update_call(
        &self,
        id: i64,
        request: CallRequest,
    ) -> Result<CallResponse, AppError> {
        ensure_valid(&request)?;
        let mut call = self.find(id).await?;

        if let Some(caller_id) = request.caller_id {
            self.require_user(caller_id).await?;
            call.caller_id = caller_id;
        }
        if let Some(recipient_id) = request.recipient_id {
            self.require_user(recipient_id).await?;
            call.recipient_id = recipient_id;
        }
        if request.theme_id.is_some() {
            self.require_theme(request.theme_id).await?;
            call.theme_id = request.theme_id;
        }
        if let Some(duration) = request.duration {
            call.duration = duration;
        }
        if let Some(status) = request.status {
            call.status = status;
        }
        if request.sum_decimal.is_some() {
            call.sum_decimal = request.sum_decimal;
        }
        if request.commission.is_some() {
            call.commission = request.commission;
        }
        if let Some(joined) = request.translator_has_joined {
            call.translator_has_joined = joined;
        }
        if let Some(rated) = request.user_has_rated {
            call.user_has_rated = rated;
        }
        if request.channel_name.is_some() {
            call.channel_name = request.channel_name;
        }
        if let Some(call_status) = request.call_status {
            call.call_status = call_status;
        }
        if let Some(ended) = request.is_end_call {
            call.is_end_call = ended;
        }

        let updated = self.calls.update_call(&call).await?;
        info!(call_id = id, call_status = %updated.call_status, ended = updated.is_end_call, "Call updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_call(&self, id: i64) -> Result<(), AppError> {
        self.calls.delete_call(id).await?;
        info!(call_id = id, "Call deleted");
        Ok(())
    }
}
