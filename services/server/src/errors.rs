use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use settlement::SettlementError;
use thiserror::Error;

use crate::services::payment_verifier::PaymentError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("Payment verification failed: {0}")]
    Payment(#[from] PaymentError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Errors that are the server's fault rather than the caller's.
    pub fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Settlement(SettlementError::NotTicketOwner) => StatusCode::FORBIDDEN,
            ApiError::Settlement(SettlementError::UnknownStatus { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Settlement(e) if e.is_conflict() => StatusCode::CONFLICT,
            ApiError::Settlement(_) => StatusCode::BAD_REQUEST,
            ApiError::Payment(e) if e.is_transport() => StatusCode::BAD_GATEWAY,
            ApiError::Payment(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("{}", self);
            match self {
                ApiError::Payment(e) => format!("Payment verification failed: {}", e),
                _ => "Internal server error".to_string(),
            }
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({
            "success": false,
            "error": message
        }))
    }
}
