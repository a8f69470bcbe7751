//! Centralized client error handling for AgriConnect
//!
//! Every fallible operation in the crate returns [`ClientError`]. Session
//! level failures (`Unauthorized`, `SessionExpired`) are terminal for the
//! current session and views react to them by routing back to login.

use thiserror::Error;

/// Client error type with stable error codes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ClientError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            ClientError::RegistrationFailed(_) => "REGISTRATION_FAILED",
            ClientError::SessionExpired => "SESSION_EXPIRED",
            ClientError::Unauthorized => "UNAUTHORIZED",
            ClientError::Network(_) => "NETWORK_ERROR",
            ClientError::Api { .. } => "API_ERROR",
            ClientError::Decode(_) => "DECODE_ERROR",
            ClientError::Storage(_) => "STORAGE_ERROR",
            ClientError::Cancelled => "CANCELLED",
            ClientError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// True when the error means the session is gone and the caller
    /// should send the user back to login.
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, ClientError::Unauthorized | ClientError::SessionExpired)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::InvalidInput(err.to_string())
    }
}

/// Result type alias using ClientError
pub type ClientResult<T> = Result<T, ClientError>;
