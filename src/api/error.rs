use crate::InventoryError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Error body returned by every endpoint: `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    Inventory(InventoryError),
    BadRequest(String),
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        Self::Inventory(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::BadRequest(msg) => return json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
            Self::Inventory(err) => err,
        };

        match err {
            InventoryError::InvalidInput(msg) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_input", msg)
            }
            InventoryError::NotFound(_) => {
                json_error(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            InventoryError::InsufficientStock { .. } => {
                json_error(StatusCode::CONFLICT, "insufficient_stock", err.to_string())
            }
            InventoryError::ProfitOverflow => {
                error!(%err, "request failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "profit_overflow", err.to_string())
            }
            InventoryError::Store(_) | InventoryError::Commit(_) | InventoryError::Export(_) => {
                error!(%err, "request failed");
                json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    "internal storage failure",
                )
            }
        }
    }
}
