//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pactum_core::error::PactumError;
use serde::Serialize;
use std::fmt;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, "{}", self.message);
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

// Convert from pactum-core errors
impl From<PactumError> for ApiError {
    fn from(err: PactumError) -> Self {
        let status = match &err {
            PactumError::NotFound { .. } => StatusCode::NOT_FOUND,
            PactumError::NotReady { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PactumError::JobFailed { .. } | PactumError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            PactumError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut details = serde_json::Map::new();
        match &err {
            PactumError::NotReady { status, .. } => {
                details.insert("status".to_string(), serde_json::json!(status));
            }
            PactumError::JobFailed { message, .. } => {
                details.insert("status".to_string(), serde_json::json!("failed"));
                details.insert("job_error".to_string(), serde_json::json!(message));
            }
            _ => {}
        }
        if let Some(suggestion) = err.suggestion() {
            details.insert("suggestion".to_string(), serde_json::json!(suggestion));
        }

        let api = ApiError::new(status, err.code().as_str(), err.to_string());
        if details.is_empty() {
            api
        } else {
            api.with_details(serde_json::Value::Object(details))
        }
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::JobStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PactumError::not_found("j1"), StatusCode::NOT_FOUND),
            (
                PactumError::NotReady {
                    job_id: "j1".to_string(),
                    status: JobStatus::Processing,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PactumError::JobFailed {
                    job_id: "j1".to_string(),
                    message: "boom".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (PactumError::empty_upload(), StatusCode::BAD_REQUEST),
            (
                PactumError::Internal("queue closed".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_not_ready_details() {
        let api = ApiError::from(PactumError::NotReady {
            job_id: "j1".to_string(),
            status: JobStatus::Pending,
        });
        assert_eq!(api.code, "JOB_003");
        assert_eq!(api.details.unwrap()["status"], "pending");
    }
}
