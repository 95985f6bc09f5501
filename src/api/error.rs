//! HTTP error responses

use super::request::{FieldError, ValidationErrors};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to API callers
#[derive(Error, Debug)]
pub enum ApiError {
    /// No model artifact was loaded at startup
    #[error("Model is not loaded.")]
    ModelUnavailable,

    /// Payload failed schema validation
    #[error("{0}")]
    Validation(#[from] ValidationErrors),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ValidationErrors(vec![FieldError::invalid_body(
            &rejection.body_text(),
        )]))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::ModelUnavailable => json!({ "detail": self.to_string() }),
            ApiError::Validation(errors) => json!({ "detail": errors }),
        };
        (status, Json(body)).into_response()
    }
}
