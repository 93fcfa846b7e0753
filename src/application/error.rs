use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

/// Text shown when the server gave no usable explanation.
pub const GENERIC_FAILURE_MESSAGE: &str = "Could not load data. Please try again.";

/// Failure classes of a backend call.
///
/// Cloneable so one outcome can be handed to every caller that joined a
/// deduplicated request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("request rejected ({status}): {message}")]
    Validation { status: u16, message: String },
    #[error("not authorized ({status})")]
    Unauthorized { status: u16 },
    #[error("server responded with {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. }
            | Self::Unauthorized { status }
            | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided text, shown verbatim when present. Messages attached
    /// to 5xx responses describe server internals and are not surfaced.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Validation { message, .. } => Some(message),
            Self::Server {
                status,
                message: Some(message),
            } if *status < 500 => Some(message),
            _ => None,
        }
    }
}

/// What a list view renders in place of the table after a failed load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPlaceholder {
    pub message: String,
    pub status: Option<u16>,
    /// Full error chain, for logs only.
    #[serde(skip)]
    pub detail: Vec<String>,
}

impl ErrorPlaceholder {
    pub fn from_error(error: &ApiError) -> Self {
        let message = error
            .server_message()
            .unwrap_or(GENERIC_FAILURE_MESSAGE)
            .to_string();
        Self {
            message,
            status: error.status(),
            detail: error_chain(error),
        }
    }
}

pub fn error_chain(error: &dyn StdError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = ApiError::Validation {
            status: 400,
            message: "Tên danh mục đã tồn tại".to_string(),
        };
        let placeholder = ErrorPlaceholder::from_error(&err);
        assert_eq!(placeholder.message, "Tên danh mục đã tồn tại");
        assert_eq!(placeholder.status, Some(400));
    }

    #[test]
    fn transport_failures_use_generic_text() {
        for err in [
            ApiError::Timeout,
            ApiError::Network("connection refused".to_string()),
            ApiError::Server {
                status: 502,
                message: None,
            },
        ] {
            let placeholder = ErrorPlaceholder::from_error(&err);
            assert_eq!(placeholder.message, GENERIC_FAILURE_MESSAGE);
            assert!(!placeholder.detail.is_empty());
        }
    }

    #[test]
    fn only_auth_failures_are_unauthorized() {
        assert!(ApiError::Unauthorized { status: 403 }.is_unauthorized());
        assert!(!ApiError::Timeout.is_unauthorized());
    }
}
