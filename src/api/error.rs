use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Client input problems. Everything else the API absorbs and degrades on.
#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("unknown role '{0}', expected one of menubar, background_service, system_total")]
    UnknownRole(String),
    #[error("'{param}' must be Unix seconds or an RFC 3339 timestamp, got '{value}'")]
    InvalidTimestamp { param: &'static str, value: String },
    #[error("resolution must be an integer between 1 and {max}, got '{value}'")]
    InvalidResolution { value: String, max: usize },
    #[error("missing required query parameter '{0}'")]
    MissingParameter(&'static str),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnknownRole(_) => "UNKNOWN_ROLE",
            ApiError::InvalidTimestamp { .. } => "INVALID_TIMESTAMP",
            ApiError::InvalidResolution { .. } => "INVALID_RESOLUTION",
            ApiError::MissingParameter(_) => "MISSING_PARAMETER",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        log::warn!("api_bad_request code={} message={}", self.code(), message);

        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: self.code(),
                message,
            }),
        )
            .into_response()
    }
}
