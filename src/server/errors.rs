use crate::error::{LlmError, ParseError, RagError};
use crate::types::ErrorBody;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// An error rendered as `{"error": message}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "No result found")
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match &err {
            RagError::Validation(v) => Self::bad_request(v.to_string()),
            RagError::Llm(LlmError::Timeout(_)) | RagError::Parse(ParseError::Timeout(..)) => {
                tracing::error!("Upstream timeout: {}", err);
                Self::new(StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out")
            }
            _ if err.is_upstream() => {
                tracing::error!("Upstream failure: {}", err);
                Self::new(StatusCode::BAD_GATEWAY, "Upstream service unavailable")
            }
            _ => {
                tracing::error!("Request failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
