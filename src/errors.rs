use sea_orm::error::DbErr;
use serde::Serialize;
use std::fmt;
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::models::JobStatus;

/// One rejected input field and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

/// Structured rejection listing every offending field of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub violations: Vec<FieldViolation>,
}

impl ValidationFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut failure = Self::new();
        failure.push(field, message);
        failure
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns `Ok(())` when nothing was recorded, otherwise the failure as an error.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(self))
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        let mut failure = ValidationFailure::new();
        flatten_validation_errors(&errors, None, &mut failure);
        // HashMap iteration order is unstable; keep reports deterministic.
        failure.violations.sort_by(|a, b| a.field.cmp(&b.field));
        failure
    }
}

fn flatten_validation_errors(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    out: &mut ValidationFailure,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(path.clone(), message);
                }
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_validation_errors(nested, Some(&path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_path = format!("{}[{}]", path, index);
                    flatten_validation_errors(nested, Some(&item_path), out);
                }
            }
        }
    }
}

/// Broad class of a failure, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, rejected before any store call.
    Validation,
    /// The referenced job does not exist.
    NotFound,
    /// Infrastructure failure: connectivity, serialization, write conflicts.
    Store,
    /// The caller is not allowed to perform the action.
    Access,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(ValidationFailure),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Concurrent modification of repair job {0}")]
    ConcurrentModification(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn db_error(err: DbErr) -> Self {
        error!("Database operation failed: {}", err);
        ServiceError::DatabaseError(err)
    }

    pub fn job_not_found(job_id: &str) -> Self {
        ServiceError::NotFound(format!("Repair job {} not found", job_id))
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ValidationError(ValidationFailure::single(field, message))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) | Self::InvalidStatus(_) | Self::InvalidTransition { .. } => {
                ErrorKind::Validation
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) | Self::Forbidden(_) => ErrorKind::Access,
            Self::DatabaseError(_)
            | Self::SerializationError(_)
            | Self::ConcurrentModification(_)
            | Self::InternalError(_) => ErrorKind::Store,
        }
    }

    /// Failures worth one transparent retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Offending fields when this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationFailure> {
        match self {
            Self::ValidationError(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.into())
    }
}

impl From<ValidationFailure> for ServiceError {
    fn from(failure: ValidationFailure) -> Self {
        ServiceError::ValidationError(failure)
    }
}
