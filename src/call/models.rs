use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::validation::{FieldError, Validate, Violations};

const MAX_CHANNEL_NAME_LEN: usize = 50;

/// Connection outcome of a call
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    #[default]
    ConnectNotSet,
    Successful,
    Missed,
    Rejected,
}

impl CallStatus {
    pub fn from_column(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// A call in this state still occupies the translator unless it has ended
    pub fn is_live(self) -> bool {
        matches!(self, CallStatus::ConnectNotSet | CallStatus::Successful)
    }
}

/// Database model for a call between a client (caller) and a translator (recipient)
#[derive(Debug, Clone, PartialEq)]
pub struct CallModel {
    pub id: i64,
    pub caller_id: i64,
    pub recipient_id: i64,
    pub theme_id: Option<i64>,
    pub duration: i32,
    /// Set once the call completed successfully
    pub status: bool,
    pub sum_decimal: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub translator_has_joined: bool,
    pub user_has_rated: bool,
    pub channel_name: Option<String>,
    pub call_status: CallStatus,
    pub is_end_call: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallModel {
    pub fn is_active(&self) -> bool {
        self.call_status.is_live() && !self.is_end_call
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCall {
    pub caller_id: i64,
    pub recipient_id: i64,
    pub theme_id: Option<i64>,
    pub duration: i32,
    pub status: bool,
    pub sum_decimal: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub translator_has_joined: bool,
    pub user_has_rated: bool,
    pub channel_name: Option<String>,
    pub call_status: CallStatus,
    pub is_end_call: bool,
}

impl NewCall {
    /// A fresh, not yet connected call between two users
    pub fn between(caller_id: i64, recipient_id: i64) -> Self {
        Self {
            caller_id,
            recipient_id,
            theme_id: None,
            duration: 0,
            status: false,
            sum_decimal: None,
            commission: None,
            translator_has_joined: false,
            user_has_rated: false,
            channel_name: None,
            call_status: CallStatus::ConnectNotSet,
            is_end_call: false,
        }
    }
}

/// Body of `POST /api/calls` and `PUT /api/calls/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub caller_id: Option<i64>,
    pub recipient_id: Option<i64>,
    pub theme_id: Option<i64>,
    pub duration: Option<i32>,
    pub status: Option<bool>,
    pub sum_decimal: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub translator_has_joined: Option<bool>,
    pub user_has_rated: Option<bool>,
    pub channel_name: Option<String>,
    pub call_status: Option<CallStatus>,
    pub is_end_call: Option<bool>,
}

impl Validate for CallRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.range(
            "duration",
            self.duration.map(i64::from),
            0,
            i64::from(i32::MAX),
        );
        v.non_negative("sumDecimal", self.sum_decimal);
        v.non_negative("commission", self.commission);
        v.max_len(
            "channelName",
            self.channel_name.as_deref(),
            MAX_CHANNEL_NAME_LEN,
        );
        v.into_errors()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub id: i64,
    pub caller_id: i64,
    pub recipient_id: i64,
    pub theme_id: Option<i64>,
    pub duration: i32,
    pub status: bool,
    pub sum_decimal: Option<Decimal>,
    pub commission: Option<Decimal>,
    pub translator_has_joined: bool,
    pub user_has_rated: bool,
    pub channel_name: Option<String>,
    pub call_status: CallStatus,
    pub is_end_call: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CallModel> for CallResponse {
    fn from(call: CallModel) -> Self {
        Self {
            id: call.id,
            caller_id: call.caller_id,
            recipient_id: call.recipient_id,
            theme_id: call.theme_id,
            duration: call.duration,
            status: call.status,
            sum_decimal: call.sum_decimal,
            commission: call.commission,
            translator_has_joined: call.translator_has_joined,
            user_has_rated: call.user_has_rated,
            channel_name: call.channel_name,
            call_status: call.call_status,
            is_end_call: call.is_end_call,
            created_at: call.created_at,
            updated_at: call.updated_at,
        }
    }
}
