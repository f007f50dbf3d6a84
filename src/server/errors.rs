use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use log::error;
use serde::Serialize;
use std::fmt;

use crate::errors::RelayError;

/// Body used for every failure that is not passed through verbatim.
pub const GENERIC_ERROR_MESSAGE: &str = "Error processing request";

/// JSON error returned to HTTP clients: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, error: message.into() }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}, {})", self.status.as_u16(), self.error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, axum::Json(self)).into_response()
    }
}

// Only validation messages reach the client; everything else is logged and
// replaced by the generic message.
impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(msg) => ApiError::new(StatusCode::BAD_REQUEST, msg),
            RelayError::Upstream(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
            RelayError::Internal(detail) => {
                error!("Internal relay error: {}", detail);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE)
            }
        }
    }
}
