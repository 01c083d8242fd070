use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::device::DeviceError;

pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Device(DeviceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "not found: {msg}"),
            AppError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            AppError::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => {
                tracing::warn!(error_type = "not_found", message = %msg, "Responding with 404");
                (StatusCode::NOT_FOUND, msg)
            }
            AppError::BadRequest(msg) => {
                tracing::warn!(error_type = "bad_request", message = %msg, "Responding with 400");
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Device(e) => {
                if e.is_transport() {
                    tracing::error!(error_type = "device_transport", error = %e, "Responding with 400");
                } else {
                    tracing::warn!(error_type = "device", error = %e, "Responding with 400");
                }
                (StatusCode::BAD_REQUEST, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DeviceError> for AppError {
    fn from(e: DeviceError) -> Self {
        AppError::Device(e)
    }
}
