use std::io;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the aws-vars CLI.
///
/// Remote lookup failures never surface here: the resolver logs them and
/// carries on. These are the failures that stop the command before or after
/// resolution.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error occurred while loading or parsing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host variables given on input are unusable.
    ///
    /// They must form a single JSON object.
    #[error("Invalid host variables: {0}")]
    InvalidHostVars(String),

    /// Failed to read input from a file or stdin.
    #[error("Failed to read input.")]
    ReadInput(#[source] io::Error),

    /// Failed to write command output.
    #[error("Failed to write output.")]
    WriteOutput(#[source] io::Error),

    /// An AWS client could not be set up.
    #[error("Failed to set up AWS client: {0}")]
    Client(#[from] aws_client::Error),
}
