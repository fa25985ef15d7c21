use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{CallModel, CallStatus, NewCall};
use crate::pagination::{Page, PageRequest};
use crate::shared::AppError;

#[async_trait]
pub trait CallRepository {
    async fn create_call(&self, call: &NewCall) -> Result<CallModel, AppError>;
    async fn get_call(&self, id: i64) -> Result<Option<CallModel>, AppError>;
    async fn list_calls(&self, page: PageRequest) -> Result<Page<CallModel>, AppError>;
    async fn update_call(&self, call: &CallModel) -> Result<CallModel, AppError>;
    async fn delete_call(&self, id: i64) -> Result<(), AppError>;
    /// Calls the user received that completed successfully
    async fn count_completed_for_recipient(&self, user_id: i64) -> Result<u64, AppError>;
    /// Whether the user is currently the recipient of a live call
    async fn exists_active_for_recipient(&self, user_id: i64) -> Result<bool, AppError>;
}

fn call_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Call not found with id {}", id))
}

pub struct InMemoryCallRepository {
    calls: RwLock<HashMap<i64, CallModel>>,
    next_id: AtomicI64,
}

impl Default for InMemoryCallRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn create_call(&self, call: &NewCall) -> Result<CallModel, AppError> {
        let now = Utc::now();
        let model = CallModel {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            caller_id: call.caller_id,
            recipient_id: call.recipient_id,
            theme_id: call.theme_id,
            duration: call.duration,
            status: call.status,
            sum_decimal: call.sum_decimal,
            commission: call.commission,
            translator_has_joined: call.translator_has_joined,
            user_has_rated: call.user_has_rated,
            channel_name: call.channel_name.clone(),
            call_status: call.call_status,
            is_end_call: call.is_end_call,
            created_at: now,
            updated_at: now,
        };
        self.calls.write().await.insert(model.id, model.clone());
        debug!(call_id = model.id, "Call created in memory");
        Ok(model)
    }

    async fn get_call(&self, id: i64) -> Result<Option<CallModel>, AppError> {
        Ok(self.calls.read().await.get(&id).cloned())
    }

    async fn list_calls(&self, page: PageRequest) -> Result<Page<CallModel>, AppError> {
        let mut calls: Vec<CallModel> = self.calls.read().await.values().cloned().collect();
        calls.sort_by_key(|c| c.id);
        Ok(page.slice(calls))
    }

    async fn update_call(&self, call: &CallModel) -> Result<CallModel, AppError> {
        let mut calls = self.calls.write().await;
        let stored = calls
            .get_mut(&call.id)
            .ok_or_else(|| call_not_found(call.id))?;
        *stored = CallModel {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..call.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_call(&self, id: i64) -> Result<(), AppError> {
        self.calls
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| call_not_found(id))
    }

    async fn count_completed_for_recipient(&self, user_id: i64) -> Result<u64, AppError> {
        Ok(self
            .calls
            .read()
            .await
            .values()
            .filter(|c| c.recipient_id == user_id && c.status)
            .count() as u64)
    }

    async fn exists_active_for_recipient(&self, user_id: i64) -> Result<bool, AppError> {
        Ok(self
            .calls
            .read()
            .await
            .values()
            .any(|c| c.recipient_id == user_id && c.is_active()))
    }
}

const CALL_COLUMNS: &str = "id, caller_id, recipient_id, theme_id, duration, status, sum_decimal, \
     commission, translator_has_joined, user_has_rated, channel_name, call_status, is_end_call, \
     created_at, updated_at";

fn call_from_row(row: &PgRow) -> CallModel {
    let call_status: String = row.get("call_status");
    CallModel {
        id: row.get("id"),
        caller_id: row.get("caller_id"),
        recipient_id: row.get("recipient_id"),
        theme_id: row.get("theme_id"),
        duration: row.get("duration"),
        status: row.get("status"),
        sum_decimal: row.get("sum_decimal"),
        commission: row.get("commission"),
        translator_has_joined: row.get("translator_has_joined"),
        user_has_rated: row.get("user_has_rated"),
        channel_name: row.get("channel_name"),
        call_status: CallStatus::from_column(&call_status),
        is_end_call: row.get("is_end_call"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub struct PostgresCallRepository {
    pool: PgPool,
}

impl PostgresCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallRepository for PostgresCallRepository {
    #[instrument(skip(self, call), fields(caller_id = call.caller_id, recipient_id = call.recipient_id))]
    async fn create_call(&self, call: &NewCall) -> Result<CallModel, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO calls (caller_id, recipient_id, theme_id, duration, status, sum_decimal, \
             commission, translator_has_joined, user_has_rated, channel_name, call_status, is_end_call) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING {}",
            CALL_COLUMNS
        ))
        .bind(call.caller_id)
        .bind(call.recipient_id)
        .bind(call.theme_id)
        .bind(call.duration)
        .bind(call.status)
        .bind(call.sum_decimal)
        .bind(call.commission)
        .bind(call.translator_has_joined)
        .bind(call.user_has_rated)
        .bind(&call.channel_name)
        .bind(call.call_status.as_ref())
        .bind(call.is_end_call)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert call");
            AppError::from(e)
        })?;

        let created = call_from_row(&row);
        debug!(call_id = created.id, "Call created in database");
        Ok(created)
    }

    async fn get_call(&self, id: i64) -> Result<Option<CallModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM calls WHERE id = $1", CALL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(call_from_row))
    }

    async fn list_calls(&self, page: PageRequest) -> Result<Page<CallModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM calls ORDER BY id LIMIT $1 OFFSET $2",
            CALL_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM calls")
            .fetch_one(&self.pool)
            .await?
            .get("total");
        Ok(Page::new(
            rows.iter().map(call_from_row).collect(),
            page,
            total as u64,
        ))
    }

    #[instrument(skip(self, call), fields(call_id = call.id))]
    async fn update_call(&self, call: &CallModel) -> Result<CallModel, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE calls SET caller_id = $2, recipient_id = $3, theme_id = $4, duration = $5, \
             status = $6, sum_decimal = $7, commission = $8, translator_has_joined = $9, \
             user_has_rated = $10, channel_name = $11, call_status = $12, is_end_call = $13, \
             updated_at = now() WHERE id = $1 RETURNING {}",
            CALL_COLUMNS
        ))
        .bind(call.id)
        .bind(call.caller_id)
        .bind(call.recipient_id)
        .bind(call.theme_id)
        .bind(call.duration)
        .bind(call.status)
        .bind(call.sum_decimal)
        .bind(call.commission)
        .bind(call.translator_has_joined)
        .bind(call.user_has_rated)
        .bind(&call.channel_name)
        .bind(call.call_status.as_ref())
        .bind(call.is_end_call)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(call_from_row)
            .ok_or_else(|| call_not_found(call.id))
    }

    #[instrument(skip(self))]
    async fn delete_call(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(call_not_found(id));
        }
        Ok(())
    }

    async fn count_completed_for_recipient(&self, user_id: i64) -> Result<u64, AppError> {
        let total: i64 = sqlx::query(
            "SELECT COUNT(*) AS total FROM calls WHERE recipient_id = $1 AND status = true",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .get("total");
        Ok(total as u64)
    }

    async fn exists_active_for_recipient(&self, user_id: i64) -> Result<bool, AppError> {
        let active: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM calls WHERE recipient_id = $1 \
             AND call_status IN ('CONNECT_NOT_SET', 'SUCCESSFUL') AND is_end_call = false) AS active",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .get("active");
        Ok(active)
    }
}
