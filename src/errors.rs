use serde::{Deserialize, Serialize};

use crate::store::{DecodeError, StoreError};

/// Error payload handed to front ends that only render a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short category (e.g. "Validation error", "Insufficient stock")
    pub error: String,
    /// Human-readable error description
    pub message: String,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(error: &ServiceError) -> Self {
        Self {
            error: error.category().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    StoreError(
        #[from]
        #[serde(skip)]
        StoreError,
    ),

    #[error("Decode error: {0}")]
    DecodeError(
        #[from]
        #[serde(skip)]
        DecodeError,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl ServiceError {
    /// Short label used when the error is surfaced next to a form.
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::StoreError(_) => "Store error",
            ServiceError::DecodeError(_) => "Decode error",
            ServiceError::NotFound(_) => "Not found",
            ServiceError::ValidationError(_) => "Validation error",
            ServiceError::AuthError(_) => "Authentication error",
            ServiceError::Unauthorized(_) => "Unauthorized",
            ServiceError::InsufficientStock(_) => "Insufficient stock",
            ServiceError::InvalidOperation(_) => "Invalid operation",
            ServiceError::ExternalServiceError(_) => "External service error",
            ServiceError::EventError(_) => "Event error",
            ServiceError::SerializationError(_) => "Serialization error",
            ServiceError::Other(_) => "Error",
        }
    }

    /// True for failures the user can fix by correcting input.
    pub fn is_recoverable_by_user(&self) -> bool {
        matches!(
            self,
            ServiceError::ValidationError(_) | ServiceError::InsufficientStock(_)
        )
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(crate::forms::first_message(&err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}
