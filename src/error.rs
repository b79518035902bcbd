use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Checkout validation failure; `category` is a stable string the
    /// storefront keys its messaging on.
    #[error("Conflict ({category}): {message}")]
    Conflict {
        category: &'static str,
        message: String,
    },
    #[error("Upstream gateway error: {0}")]
    Gateway(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::checkout::CheckoutError> for AppError {
    fn from(err: crate::checkout::CheckoutError) -> Self {
        use crate::checkout::CheckoutError;
        match err {
            CheckoutError::CartNotFound => AppError::NotFound("cart not found".to_string()),
            CheckoutError::OrderNotFound => AppError::NotFound("order not found".to_string()),
            CheckoutError::EmptyCart => AppError::BadRequest("cart is empty".to_string()),
            CheckoutError::MissingAddress => {
                AppError::BadRequest("an address is required".to_string())
            }
            CheckoutError::Rejected(issues) => {
                let category = issues
                    .first()
                    .map(|i| i.kind.category())
                    .unwrap_or("item_invalid");
                let message = issues
                    .iter()
                    .map(|i| format!("{}: {}", i.reference, i.detail))
                    .collect::<Vec<_>>()
                    .join("; ");
                AppError::Conflict { category, message }
            }
            CheckoutError::NotPending => AppError::Conflict {
                category: "not_pending",
                message: "order is not pending".to_string(),
            },
            CheckoutError::Gateway(e) => AppError::Gateway(e.to_string()),
            CheckoutError::Db(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Config(msg) | AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Conflict { category, message } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "category": category }),
            ),
            AppError::Gateway(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
