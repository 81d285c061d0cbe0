//! Application error types and handling.
//!
//! Provides structured error responses for the API.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::upstream::{Endpoint, FetchError};

/// Advisory shown when the upstream did not answer within the retry budget.
pub const WAKING_UP_MESSAGE: &str =
    "The server is waking up from inactivity. Please try again in a few moments.";

/// Details attached to [`WAKING_UP_MESSAGE`].
pub const WAKING_UP_DETAILS: &str =
    "This is normal behavior for the first request after 15 minutes of inactivity.";

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad request.
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    /// The upstream kept timing out after every retry.
    #[error("Upstream timed out after all retries")]
    UpstreamTimeout,

    /// Any other upstream failure.
    #[error("{message}")]
    Upstream {
        message: String,
        details: Option<String>,
    },

    /// The client used up its request quota.
    #[error("Too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a bad request error for a missing `query` parameter.
    pub fn missing_query(name: &str) -> Self {
        Self::BadRequest {
            message: format!("Missing {} query parameter", name),
            details: None,
        }
    }

    /// Translate a failed upstream fetch for `endpoint`.
    ///
    /// Only retrying endpoints report timeouts as such; single-shot
    /// endpoints fold them into the generic failure.
    pub fn from_fetch(endpoint: Endpoint, err: &FetchError) -> Self {
        if endpoint.is_retrying() && err.is_timeout() {
            return Self::UpstreamTimeout;
        }

        Self::Upstream {
            message: endpoint.failure_message().to_string(),
            details: Some(err.to_string()),
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::BadRequest { message, details } | Self::Upstream { message, details } => {
                let body = ErrorResponse::new(message.as_str());
                match details {
                    Some(details) => body.with_details(details.as_str()),
                    None => body,
                }
            }
            Self::UpstreamTimeout => {
                ErrorResponse::new(WAKING_UP_MESSAGE).with_details(WAKING_UP_DETAILS)
            }
            Self::RateLimited => {
                ErrorResponse::new("Too many requests, please try again later.")
            }
            Self::Internal(_) => ErrorResponse::new("Something broke!"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        tracing::error!(
            error_code = %self.error_code(),
            status = %status.as_u16(),
            message = %self,
            "API error"
        );

        HttpResponse::build(status).json(self.body())
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::missing_query("search").error_code(), "BAD_REQUEST");
        assert_eq!(AppError::UpstreamTimeout.error_code(), "UPSTREAM_TIMEOUT");
        assert_eq!(AppError::RateLimited.error_code(), "RATE_LIMITED");
        assert_eq!(AppError::Internal("x".into()).error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::missing_query("song").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UpstreamTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            AppError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_query_body_has_no_details() {
        let json = serde_json::to_value(AppError::missing_query("search").body()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": "Missing search query parameter" })
        );
    }

    #[test]
    fn test_timeout_only_surfaces_on_retrying_endpoints() {
        let timeout = FetchError::Timeout("operation timed out".into());

        assert!(matches!(
            AppError::from_fetch(Endpoint::Song, &timeout),
            AppError::UpstreamTimeout
        ));

        match AppError::from_fetch(Endpoint::Album, &timeout) {
            AppError::Upstream { message, details } => {
                assert_eq!(message, "Failed to fetch album data from JioSaavn API");
                assert_eq!(details.as_deref(), Some("operation timed out"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_error_carries_details() {
        let err = AppError::from_fetch(Endpoint::Search, &FetchError::Status(502));
        let json = serde_json::to_value(err.body()).unwrap();

        assert_eq!(json["error"], "Failed to fetch data from JioSaavn API");
        assert_eq!(json["details"], "Request failed with status code 502");
    }
}
