//! Error types for AWS client operations.
//!
//! Errors are converted into the core crate's [`StoreError`] and
//! [`MetadataError`] at the trait boundary, where the resolver logs them and
//! carries on.

use aws_vars_core::{MetadataError, StoreError};

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur while talking to AWS endpoints.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP request could not be sent or its body could not be read.
    ///
    /// Covers connection failures and timeouts.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    ///
    /// `message` carries the AWS error type and message when the body had one,
    /// or the request path for metadata calls.
    #[error("Endpoint returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Failed to deserialize AWS response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The response was readable but not usable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A configured endpoint is not a valid URL.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// No usable credentials were found.
    #[error("No AWS credentials available: {0}")]
    Credentials(String),

    /// The request could not be signed.
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl From<Error> for StoreError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpStatus { status, message } => StoreError::HttpStatus { status, message },
            Error::Deserialization(e) => StoreError::InvalidResponse {
                reason: e.to_string(),
            },
            Error::InvalidResponse(reason) => StoreError::InvalidResponse { reason },
            Error::Credentials(reason) => StoreError::CredentialsUnavailable { reason },
            other => StoreError::Transport {
                reason: other.to_string(),
            },
        }
    }
}

impl From<Error> for MetadataError {
    fn from(err: Error) -> Self {
        match err {
            Error::HttpStatus { status, message } => MetadataError::HttpStatus {
                status,
                path: message,
            },
            Error::Deserialization(e) => MetadataError::InvalidResponse {
                reason: e.to_string(),
            },
            Error::InvalidResponse(reason) => MetadataError::InvalidResponse { reason },
            other => MetadataError::Transport {
                reason: other.to_string(),
            },
        }
    }
}
