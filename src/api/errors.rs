// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::search::SearchError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// Body could not be parsed as the expected JSON
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    /// The search provider refused or throttled us
    UpstreamRateLimited { retry_after: u64 },
    UpstreamTimeout { timeout_ms: u64 },
    UpstreamError(String),
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::UpstreamRateLimited { retry_after } => {
                let mut details = HashMap::new();
                details.insert(
                    "retry_after".to_string(),
                    serde_json::Value::Number((*retry_after).into()),
                );
                (
                    "search_rate_limited",
                    "Search provider rate limit exceeded".to_string(),
                    Some(details),
                )
            }
            ApiError::UpstreamTimeout { timeout_ms } => (
                "search_timeout",
                format!("Search provider timed out after {}ms", timeout_ms),
                None,
            ),
            ApiError::UpstreamError(msg) => ("search_failed", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UpstreamRateLimited { .. }
            | ApiError::UpstreamTimeout { .. }
            | ApiError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::InvalidQuery { reason } => ApiError::ValidationError {
                field: "q".to_string(),
                message: reason,
            },
            SearchError::RateLimited { retry_after_secs } => ApiError::UpstreamRateLimited {
                retry_after: retry_after_secs,
            },
            SearchError::Timeout { timeout_ms } => ApiError::UpstreamTimeout { timeout_ms },
            e @ SearchError::ApiError { .. } => ApiError::UpstreamError(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::UpstreamRateLimited { retry_after } => write!(
                f,
                "Search provider rate limited, retry after {} seconds",
                retry_after
            ),
            ApiError::UpstreamTimeout { timeout_ms } => {
                write!(f, "Search provider timed out after {}ms", timeout_ms)
            }
            ApiError::UpstreamError(msg) => write!(f, "Search provider error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
