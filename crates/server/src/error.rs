use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{payment::PaymentError, transaction::TransactionError},
};
use services::services::{
    reconcile::ReconcileError, vault::VaultError, verify::WebhookAuthError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] WebhookAuthError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("Too many requests, please retry later")]
    RateLimitExceeded,
    #[error("No tenant ID found")]
    MissingTenant,
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code) = match &self {
            ApiError::Auth(err) => match err {
                WebhookAuthError::MissingSignature => {
                    (StatusCode::UNAUTHORIZED, "MISSING_SIGNATURE")
                }
                WebhookAuthError::InvalidSignature => {
                    (StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE")
                }
                WebhookAuthError::IntegrationNotConfigured(_) => {
                    (StatusCode::BAD_REQUEST, "INTEGRATION_NOT_FOUND")
                }
                WebhookAuthError::SecretMissing => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "WEBHOOK_SECRET_MISSING")
                }
                WebhookAuthError::Vault(_) | WebhookAuthError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "VERIFICATION_ERROR")
                }
            },
            ApiError::Reconcile(err) => match err {
                ReconcileError::OutletNotConfigured(_) => {
                    (StatusCode::BAD_REQUEST, "OUTLET_NOT_CONFIGURED")
                }
                ReconcileError::MissingOrderId | ReconcileError::MissingReference => {
                    (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD")
                }
                ReconcileError::PaymentNotFound => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
                ReconcileError::Database(_)
                | ReconcileError::Transaction(_)
                | ReconcileError::Payment(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::Vault(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Database(err) => match err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Transaction(err) => match err {
                TransactionError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Payment(err) => match err {
                PaymentError::NotFound => (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            ApiError::MissingTenant => (StatusCode::BAD_REQUEST, "NO_TENANT"),
            ApiError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match &self {
            ApiError::Auth(WebhookAuthError::Vault(_))
            | ApiError::Auth(WebhookAuthError::Database(_)) => {
                "Failed to verify webhook signature".to_string()
            }
            other => other.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_code,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error_with_code(error_code, &message);
        (status_code, Json(response)).into_response()
    }
}
