//! Error types for the verification system
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for verification operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the verification system
#[derive(Error, Debug)]
pub enum Error {
    /// Inbound record failed validation (rejected, never retried)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// DNS lookup failed (network, timeout)
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Resolver answered, but reported a failure (SERVFAIL, REFUSED, ...)
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Resolver response could not be parsed
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Callback delivery errors
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Task could not be enqueued
    #[error("Scheduling failed: {0}")]
    Schedule(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a resolver-reported failure
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }

    /// Create a malformed response error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a scheduling error
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was caused by the request itself rather than by a
    /// collaborator. Such errors are rejected and never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Json(_))
    }
}
