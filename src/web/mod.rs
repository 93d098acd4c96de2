//! HTTP error mapping shared by the save server handlers.

use crate::core::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Store(StoreError),
    Input(String),
    Internal(String),
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        WebError::Store(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Store(StoreError::Serialization(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "serialization_error".to_string())
            }
            WebError::Store(err @ StoreError::QuotaExceeded { .. }) => (
                StatusCode::INSUFFICIENT_STORAGE,
                err.to_string(),
                "quota_exceeded".to_string(),
            ),
            WebError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                "storage_error".to_string(),
            ),
            WebError::Input(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg,
                "input_error".to_string(),
            ),
            WebError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "internal_error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            ok: false,
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::WebError;
    use crate::core::StoreError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn failed_background_work_maps_to_internal_server_error() {
        let response = WebError::Internal("writer task panicked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn io_errors_map_to_internal_server_error() {
        let response = WebError::from(StoreError::IoError("disk full".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn input_errors_map_to_unprocessable_entity() {
        let response = WebError::Input("payload must be an object".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
