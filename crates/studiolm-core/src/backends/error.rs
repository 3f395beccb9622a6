//! Backend adapter error types
//!
//! These are the hard failures of a chat request: unlike tool execution
//! there is no meaningful partial answer to degrade to when the backend
//! itself cannot be reached or talks nonsense.

use thiserror::Error;

/// Errors that can occur while driving a chat backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Missing API key
    #[error("API key is required for {backend}")]
    MissingApiKey { backend: String },

    /// The backend returned a non-success status
    #[error("{backend} API error ({status}): {message}")]
    ApiError {
        backend: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend answered with a shape we cannot use
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Create an API error
    pub fn api_error(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            backend: backend.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(backend: impl Into<String>) -> Self {
        Self::MissingApiKey {
            backend: backend.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
