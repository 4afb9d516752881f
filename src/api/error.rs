//! Boundary errors for the HTTP surface.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No file arrived where one was required
    #[error("No file uploaded")]
    MissingInput,

    /// Malformed request body or invalid parameter values
    #[error("{0}")]
    BadRequest(String),

    /// Decode, resize, or encode failure
    #[error("Failed to process image: {0}")]
    Processing(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingInput | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-safe message, without internal detail.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::MissingInput => "No file uploaded".to_string(),
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Processing(_) => "Failed to process image".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Processing(_) => log::error!("Processing error: {}", self),
            _ => log::debug!("Client error: {}", self),
        }

        let body = json!({ "error": self.user_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(format!("Failed to parse multipart data: {}", e))
    }
}
