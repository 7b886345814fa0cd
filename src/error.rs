use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::ErrorBody;

/// Failures of the counting procedure and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum LimiterError {
    /// Window length was zero, negative or longer than a year
    #[error("window_minutes must be between 1 and 525600, got {0}")]
    InvalidWindow(i64),

    /// Datastore unreachable or returned an error status
    #[error("rate limit store error: {0}")]
    Store(String),

    /// Datastore answered but the payload was unusable
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LimiterError {
    fn from(err: reqwest::Error) -> Self {
        LimiterError::Store(err.to_string())
    }
}

/// Errors the limiter function reports to its HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Endpoint is required")]
    MissingEndpoint,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("{0}")]
    InvalidPolicy(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingEndpoint | ApiError::InvalidBody(_) | ApiError::InvalidPolicy(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LimiterError> for ApiError {
    fn from(err: LimiterError) -> Self {
        match err {
            LimiterError::InvalidWindow(_) => ApiError::InvalidPolicy(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
