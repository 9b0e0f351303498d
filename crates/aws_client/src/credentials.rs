//! AWS credentials and where to find them.
//!
//! Credentials are looked up in this order:
//! 1. `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (and optional
//!    `AWS_SESSION_TOKEN`) from the environment
//! 2. the instance role, through the instance metadata service

use crate::{imds::ImdsClient, Error};
use aws_vars_core::DEFAULT_TOKEN_TTL_SECONDS;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// A set of AWS credentials.
///
/// Secret parts are held in [`SecretString`] and never appear in `Debug` output.
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: session_token.map(SecretString::from),
        }
    }

    /// Reads credentials from environment variables.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through an arbitrary variable lookup.
    ///
    /// Both the key id and the secret must be present and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let access_key_id = non_empty(ENV_ACCESS_KEY_ID)?;
        let secret_access_key = non_empty(ENV_SECRET_ACCESS_KEY)?;
        Some(Self::new(
            access_key_id,
            secret_access_key,
            non_empty(ENV_SESSION_TOKEN),
        ))
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|token| token.expose_secret())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Instance role credentials as served by the metadata service.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RoleCredentialsDocument {
    pub code: Option<String>,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    pub token: Option<String>,
}

impl RoleCredentialsDocument {
    pub(crate) fn into_credentials(self) -> Result<AwsCredentials, Error> {
        match self.code.as_deref() {
            None | Some("Success") => Ok(AwsCredentials::new(
                self.access_key_id,
                self.secret_access_key,
                self.token,
            )),
            Some(code) => Err(Error::Credentials(format!(
                "instance role credentials unavailable: {code}"
            ))),
        }
    }
}

/// Where to look for credentials.
#[derive(Debug, Clone)]
pub enum CredentialsProvider {
    /// Fixed credentials.
    Static(Arc<AwsCredentials>),

    /// Environment first, then the instance role if a metadata client is given.
    Default { imds: Option<Arc<ImdsClient>> },
}

impl CredentialsProvider {
    /// Resolves credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credentials`] when no source has credentials, or the
    /// metadata error when the instance role lookup fails.
    pub async fn credentials(&self) -> Result<Arc<AwsCredentials>, Error> {
        match self {
            CredentialsProvider::Static(credentials) => Ok(credentials.clone()),
            CredentialsProvider::Default { imds } => {
                if let Some(credentials) = AwsCredentials::from_env() {
                    debug!("Using AWS credentials from the environment");
                    return Ok(Arc::new(credentials));
                }

                let imds = imds.as_ref().ok_or_else(|| {
                    Error::Credentials(format!(
                        "{ENV_ACCESS_KEY_ID}/{ENV_SECRET_ACCESS_KEY} not set and instance metadata disabled"
                    ))
                })?;

                let credentials = imds.role_credentials(DEFAULT_TOKEN_TTL_SECONDS).await?;
                debug!("Using AWS credentials from the instance role");
                Ok(Arc::new(credentials))
            }
        }
    }
}
