// Error types shared by the API client, the session holder and the form controllers

use chrono::NaiveDate;
use reqwest::StatusCode;
use thiserror::Error;

// Errors coming back from the remote travel API.
// Every call site catches these and turns them into UI state; none are fatal.
#[derive(Debug, Error)]
pub enum ApiError {
    // Network errors, DNS failures, timeouts
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    // Any non-2xx response. `detail` carries the server's message when the body had one.
    #[error("{path} returned {status}")]
    Status {
        path: String,
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Server-provided error message, if the response body carried one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport { source, .. } | ApiError::Decode { source, .. } => source.status(),
        }
    }
}

// Problems converting the editable search record into an outbound request
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid {field} date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("start date {start} is after end date {end}")]
    DateOrder { start: NaiveDate, end: NaiveDate },
    #[error("minimum budget {min} exceeds maximum budget {max}")]
    BudgetOrder { min: f64, max: f64 },
    #[error("traveler count must be at least 1")]
    NoTravelers,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_exposes_detail_and_status() {
        let err = ApiError::Status {
            path: "/users/login".to_string(),
            status: StatusCode::UNAUTHORIZED,
            detail: Some("Invalid credentials".to_string()),
        };
        assert_eq!(err.detail(), Some("Invalid credentials"));
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "/users/login returned 401 Unauthorized");
    }
}
