use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::validation::{FieldError, Validate, Violations};

const MAX_NAME_LEN: usize = 200;

/// The two reference lists translators pick from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CatalogKind {
    Language,
    Theme,
}

impl CatalogKind {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Language => "languages",
            CatalogKind::Theme => "themes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Language => "Language",
            CatalogKind::Theme => "Theme",
        }
    }
}

/// A language or theme row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
}

/// Body of `POST /api/languages` and `POST /api/themes`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCatalogItemRequest {
    pub name: Option<String>,
}

impl Validate for CreateCatalogItemRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut v = Violations::new();
        v.not_blank("name", self.name.as_deref());
        v.max_len("name", self.name.as_deref(), MAX_NAME_LEN);
        v.into_errors()
    }
}
