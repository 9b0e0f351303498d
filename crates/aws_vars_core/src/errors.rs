//! Error types for remote variable sources.
//!
//! None of these errors ever reach the caller of
//! [`HostVarsResolver::resolve`](crate::HostVarsResolver::resolve): the resolver
//! logs them and treats the failing source as empty. They exist so that store
//! and metadata implementations can report precisely what went wrong.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised by a [`ParameterStore`](crate::ParameterStore) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Parameter store request failed: {reason}")]
    Transport { reason: String },

    #[error("Parameter store returned HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Parameter store returned an invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("No credentials available for the parameter store: {reason}")]
    CredentialsUnavailable { reason: String },
}

/// Errors raised by an [`InstanceMetadataProvider`](crate::InstanceMetadataProvider).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    #[error("Instance metadata request failed: {reason}")]
    Transport { reason: String },

    #[error("Instance metadata service returned HTTP {status} for {path}")]
    HttpStatus { status: u16, path: String },

    #[error("Instance metadata service returned an invalid response: {reason}")]
    InvalidResponse { reason: String },
}

/// Result type alias for parameter store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for instance metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
