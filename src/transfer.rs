use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Review state of a deposit or withdrawal request
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
pub enum TransferStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl TransferStatus {
    /// Parses a stored status, treating unknown text as pending
    pub fn from_column(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}
