use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use payment::{ErrorCategory, PaymentError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Error type for the HTTP surface
#[derive(Debug)]
pub enum ApiError {
    /// Failure raised by a payment action or lookup
    Payment(PaymentError),

    // Request errors caught before reaching the payment layer
    InvalidInput(String),
    NotFound(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Payment(err) => write!(f, "{}", err),
            ApiError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

/// HTTP status for a payment error category
pub fn status_for(category: ErrorCategory) -> StatusCode {
    match category {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Wallet => StatusCode::UNAUTHORIZED,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Transaction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCategory::Network | ErrorCategory::Decode => StatusCode::BAD_GATEWAY,
        ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::Payment(err) => {
                let category = err.category();
                match category {
                    ErrorCategory::Internal => {
                        error!("Payment error: {}", err);
                        (
                            status_for(category),
                            category.to_string(),
                            "An internal error occurred".to_string(),
                        )
                    }
                    ErrorCategory::Network | ErrorCategory::Decode | ErrorCategory::Timeout => {
                        error!("Chain error [{}]: {}", category, err);
                        (status_for(category), category.to_string(), err.user_message())
                    }
                    _ => (status_for(category), category.to_string(), err.user_message()),
                }
            }
            ApiError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "validation".to_string(), msg.clone())
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found".to_string(), msg.clone())
            }
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal".to_string(),
                    "An internal error occurred".to_string(),
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_type,
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}

impl From<shared::Error> for ApiError {
    fn from(err: shared::Error) -> Self {
        ApiError::Payment(PaymentError::Chain(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
