use actix_session::{SessionGetError, SessionInsertError};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::payment::PaymentError;

/// Unified handler error. Converted into a JSON `{"message": ...}` body
/// with the matching status code by the `ResponseError` impl.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error")]
    Database(#[from] diesel::result::Error),
    #[error("database connection unavailable")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("session error")]
    Session(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("internal server error")]
    Internal(String),
}

impl From<SessionGetError> for ApiError {
    fn from(err: SessionGetError) -> Self {
        ApiError::Session(err.to_string())
    }
}

impl From<SessionInsertError> for ApiError {
    fn from(err: SessionInsertError) -> Self {
        ApiError::Session(err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(diesel::result::Error::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Payment(PaymentError::AmountOutOfRange(_))
            | ApiError::Payment(PaymentError::UnrepresentableAmount(_)) => StatusCode::BAD_REQUEST,
            ApiError::Payment(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("request failed: {self:?}");
        }
        let message = match self {
            ApiError::Database(diesel::result::Error::NotFound) => "record not found".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(status).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::NotFound("no such product".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn missing_row_maps_to_404() {
        let err = ApiError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn provider_failure_maps_to_502() {
        let err = ApiError::from(PaymentError::Provider {
            status: 401,
            message: "invalid api key".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn bad_amount_maps_to_400() {
        let err = ApiError::from(PaymentError::AmountOutOfRange(0));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
