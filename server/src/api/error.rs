use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::error::Error;

#[derive(Debug)]
pub enum AppError {
    Storage(Error),
    Unauthorized(&'static str),
    Forbidden,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Storage(Error::NotFound(what)) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "resource not found", "resource": what }),
            ),
            AppError::Storage(Error::Validation { field, message }) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "field": field }),
            ),
            AppError::Storage(Error::Conflict(what)) => (
                StatusCode::CONFLICT,
                json!({ "error": "already exists", "resource": what }),
            ),
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "error": message }))
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Administrator access required" }),
            ),
            AppError::Storage(e) => {
                // Corrupt items and backend failures carry keys; log, never return them
                error!("API storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Internal(e) => {
                error!("API error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        if status.is_client_error() {
            warn!("API request rejected with {}: {}", status, body);
        }
        (status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Storage(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

pub type ApiResult<T> = Result<T, AppError>;
