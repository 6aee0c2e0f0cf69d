use std::fmt;

use serde::Serialize;
use thiserror::Error as ThisError;

/// Field key used for errors that are not tied to a single input field.
pub const ROOT_FIELD: &str = "root";

/// The error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    BusinessRule,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::BusinessRule => "business_rule",
            ErrorKind::Storage => "storage",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn root(message: impl Into<String>) -> Self {
        Self::new(ROOT_FIELD, message)
    }

    pub fn is_root(&self) -> bool {
        self.field == ROOT_FIELD
    }
}

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum StoreError {
    #[error("invalid input: {}", summarize(.0))]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Rule(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn not_found(resource: &str, id: i64) -> Self {
        StoreError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Rule(_) => ErrorKind::BusinessRule,
            StoreError::Database(_) => ErrorKind::Storage,
        }
    }

    /// Field-keyed errors for the caller. Everything except validation
    /// collapses to a single root entry.
    pub fn into_field_errors(self) -> Vec<FieldError> {
        match self {
            StoreError::Validation(errors) => errors,
            other => vec![FieldError::root(other.to_string())],
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(format!(
                    "Order conflict, another change landed first: {}",
                    db_err.message()
                ));
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::Conflict(format!(
                    "Referenced record no longer exists: {}",
                    db_err.message()
                ));
            }
        }
        StoreError::Database(e)
    }
}
