use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::shared::AppError;

lazy_static! {
    // RFC 5322 simplified, same shape most mail providers accept
    static ref EMAIL_REGEX: Option<Regex> = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .ok();

    // Usernames are phone numbers: optional leading +, then digits
    static ref PHONE_REGEX: Option<Regex> = Regex::new(r"^\+?[0-9]{7,20}$").ok();
}

/// A single rejected field of a request body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Request types list their own field errors; an empty list means valid
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;
}

/// Runs validation and turns any field errors into `AppError::ValidationFailed`
pub fn ensure_valid<T: Validate>(request: &T) -> Result<(), AppError> {
    let errors = request.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationFailed(errors))
    }
}

/// Collects field errors while checking a request
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn required<T>(&mut self, field: &str, value: Option<&T>) {
        if value.is_none() {
            self.add(field, "must not be null");
        }
    }

    pub fn not_blank(&mut self, field: &str, value: Option<&str>) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.add(field, "must not be blank");
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, &format!("size must be at most {}", max));
            }
        }
    }

    pub fn email(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            let matches = EMAIL_REGEX.as_ref().is_some_and(|re| re.is_match(v.trim()));
            if !matches {
                self.add(field, "must be a well-formed email address");
            }
        }
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            let matches = PHONE_REGEX.as_ref().is_some_and(|re| re.is_match(v.trim()));
            if !matches {
                self.add(field, "must be a phone number");
            }
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<Decimal>) {
        if value.is_some_and(|v| v < Decimal::ZERO) {
            self.add(field, "must be greater than or equal to 0");
        }
    }

    pub fn range(&mut self, field: &str, value: Option<i64>, min: i64, max: i64) {
        if let Some(v) = value {
            if v < min || v > max {
                self.add(field, &format!("must be between {} and {}", min, max));
            }
        }
    }

    pub fn past(&mut self, field: &str, value: Option<NaiveDate>) {
        if value.is_some_and(|d| d >= Utc::now().date_naive()) {
            self.add(field, "must be a past date");
        }
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.0
    }
}
