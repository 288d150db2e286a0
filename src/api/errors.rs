use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use super::dto::ErrorResponse;
use crate::sensors::SensorError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound,
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
            AppError::Internal(e) => {
                error!(error = ?e, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<SensorError> for AppError {
    fn from(e: SensorError) -> Self {
        match e {
            SensorError::Validation(message) => Self::BadRequest(message),
            SensorError::NotFound(_) => Self::NotFound,
            SensorError::Storage(e) => Self::Internal(e.into()),
        }
    }
}

/// Missing, mistyped or unparsable JSON bodies are all client errors.
impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        debug!(error = %e, "Rejected request body");
        Self::BadRequest(format!("Bad Request: {}", e.body_text()))
    }
}

/// An id segment that is not an integer does not name any sensor.
impl From<PathRejection> for AppError {
    fn from(e: PathRejection) -> Self {
        debug!(error = %e, "Rejected path");
        Self::NotFound
    }
}
