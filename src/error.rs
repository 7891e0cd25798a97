use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a snapshot from the upstream provider.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {excerpt}")]
    Status {
        status: reqwest::StatusCode,
        excerpt: String,
    },

    #[error("Parse error: {source}")]
    Parse {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fetch timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum CacheError {
    /// Nothing cached yet and the refresh attempt failed.
    #[error("No chain available")]
    NoChainAvailable(#[source] UpstreamError),
}

// -----------------------------------------------
// HTTP-FACING ERRORS
// -----------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors surfaced by the request handlers. The response body only ever
/// carries the generic message, never upstream detail.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("No chain available")]
    NoChain,

    #[error("Failed to fetch live premiums")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoChain | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NoChainAvailable(_) => ApiError::NoChain,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}
