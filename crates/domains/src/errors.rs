//! # AppError
//!
//! Centralized error handling for the marketplace client.
//! Every failure degrades to a [`Notice`] shown to the user; none is fatal.

use thiserror::Error;

/// The primary error type for all port and service operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Resource not found (e.g., Domain, ChatSession, SavedFilter)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Rejected locally before any request was made (e.g., inverted range, empty name)
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (HTTP 409, e.g., duplicate saved-filter name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other non-2xx response from the backend
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never completed (connection refused, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response whose body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Local invariant failure (e.g., no active session to send into)
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for marketplace logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// A user-facing notification (what the web client rendered as a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

impl AppError {
    /// Builds an `Api` error, keeping the distinguished statuses distinguished.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => AppError::NotFound("resource".into(), message),
            409 => AppError::Conflict(message),
            _ => AppError::Api { status, message },
        }
    }

    /// True when retrying later (the poll) could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transport(_) => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Maps the error to the notification the user sees.
    pub fn notice(&self) -> Notice {
        match self {
            AppError::Conflict(_) => Notice::new(
                "Name Already Exists",
                "A saved filter with this name already exists. Please choose a different name.",
            ),
            AppError::Validation(msg) => Notice::new("Invalid input", msg.clone()),
            AppError::NotFound(kind, _) => Notice::new("Not found", format!("The {kind} could not be found.")),
            AppError::Api { message, .. } if !message.is_empty() => Notice::new("Error", message.clone()),
            _ => Notice::new("Error", "Something went wrong. Please try again."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_name_already_exists() {
        let err = AppError::from_status(409, "Filter name already exists");
        assert_eq!(err, AppError::Conflict("Filter name already exists".into()));
        assert_eq!(err.notice().title, "Name Already Exists");
    }

    #[test]
    fn api_message_is_surfaced_and_empty_falls_back_to_generic() {
        let err = AppError::from_status(422, "price must be positive");
        assert_eq!(err.notice().description, "price must be positive");

        let err = AppError::from_status(500, "");
        assert_eq!(err.notice().description, "Something went wrong. Please try again.");
        assert!(err.is_transient());
    }

    #[test]
    fn transport_errors_get_generic_notice() {
        let err = AppError::Transport("connection refused".into());
        assert_eq!(err.notice().title, "Error");
        assert!(err.is_transient());
        assert!(!AppError::Validation("x".into()).is_transient());
    }
}
