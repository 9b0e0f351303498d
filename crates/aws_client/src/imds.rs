//! Client for the EC2 instance metadata service (IMDSv2).
//!
//! Every read is authorized by a session token obtained with a `PUT` to
//! `/latest/api/token`. The token is passed back in the
//! `X-aws-ec2-metadata-token` header.

use crate::{credentials::RoleCredentialsDocument, AwsCredentials, Error};
use async_trait::async_trait;
use aws_vars_core::{InstanceMetadataProvider, MetadataError, MetadataResult};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

#[cfg(test)]
#[path = "imds_tests.rs"]
mod tests;

pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
pub const DEFAULT_IMDS_TIMEOUT: Duration = Duration::from_secs(2);

pub const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
pub const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

const TOKEN_PATH: &[&str] = &["latest", "api", "token"];
const TAGS_PATH: &[&str] = &["latest", "meta-data", "tags", "instance"];
const ROLE_CREDENTIALS_PATH: &[&str] = &["latest", "meta-data", "iam", "security-credentials"];

/// Connection settings for the metadata service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImdsConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ImdsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            timeout: DEFAULT_IMDS_TIMEOUT,
        }
    }
}

/// HTTP client for the instance metadata service.
#[derive(Debug)]
pub struct ImdsClient {
    http: reqwest::Client,
    base: Url,
}

impl ImdsClient {
    /// Creates a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the endpoint is not an absolute
    /// URL, or [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ImdsConfig) -> Result<Self, Error> {
        let base = parse_base_url(&config.endpoint)?;
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, base })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidEndpoint {
                endpoint: self.base.to_string(),
                reason: "URL cannot be a base".to_string(),
            })?
            .clear()
            .extend(segments);
        Ok(url)
    }

    async fn get_text(&self, url: Url, token: &str) -> Result<String, Error> {
        let response = self.http.get(url).header(TOKEN_HEADER, token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                message: response.url().path().to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Requests a new session token.
    #[instrument(skip(self))]
    pub async fn fetch_token(&self, ttl_seconds: u32) -> Result<String, Error> {
        let url = self.url(TOKEN_PATH)?;
        let response = self
            .http
            .put(url)
            .header(TOKEN_TTL_HEADER, ttl_seconds.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                message: response.url().path().to_string(),
            });
        }

        let token = response.text().await?.trim().to_string();
        if token.is_empty() {
            return Err(Error::InvalidResponse(
                "metadata service returned an empty token".to_string(),
            ));
        }

        debug!("Obtained instance metadata token");
        Ok(token)
    }

    /// Lists the instance tag names.
    pub async fn tag_names(&self, token: &str) -> Result<Vec<String>, Error> {
        let body = self.get_text(self.url(TAGS_PATH)?, token).await?;
        Ok(non_empty_lines(&body))
    }

    /// Reads one instance tag value.
    pub async fn tag_value(&self, token: &str, name: &str) -> Result<String, Error> {
        let mut segments = TAGS_PATH.to_vec();
        segments.push(name);
        self.get_text(self.url(&segments)?, token).await
    }

    /// Reads the credentials of the instance role.
    ///
    /// Uses the first role listed by the metadata service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Credentials`] when no role is attached or the service
    /// reports a failure code, and transport errors as they occur.
    #[instrument(skip(self))]
    pub async fn role_credentials(&self, ttl_seconds: u32) -> Result<AwsCredentials, Error> {
        let token = self.fetch_token(ttl_seconds).await?;

        let mut list_path = ROLE_CREDENTIALS_PATH.to_vec();
        list_path.push("");
        let roles = self.get_text(self.url(&list_path)?, &token).await?;
        let role = non_empty_lines(&roles)
            .into_iter()
            .next()
            .ok_or_else(|| Error::Credentials("no instance role attached".to_string()))?;

        let mut role_path = ROLE_CREDENTIALS_PATH.to_vec();
        role_path.push(&role);
        let body = self.get_text(self.url(&role_path)?, &token).await?;

        let document: RoleCredentialsDocument = serde_json::from_str(&body)?;
        debug!(role = %role, "Read instance role credentials");
        document.into_credentials()
    }
}

#[async_trait]
impl InstanceMetadataProvider for ImdsClient {
    async fn get_token(&self, ttl_seconds: u32) -> MetadataResult<String> {
        self.fetch_token(ttl_seconds)
            .await
            .map_err(MetadataError::from)
    }

    async fn list_tag_names(&self, token: &str) -> MetadataResult<Vec<String>> {
        self.tag_names(token).await.map_err(MetadataError::from)
    }

    async fn get_tag_value(&self, token: &str, name: &str) -> MetadataResult<String> {
        self.tag_value(token, name)
            .await
            .map_err(MetadataError::from)
    }
}

pub(crate) fn parse_base_url(endpoint: &str) -> Result<Url, Error> {
    let url = Url::parse(endpoint).map_err(|e| Error::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "expected an http or https URL".to_string(),
        });
    }

    Ok(url)
}

fn non_empty_lines(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
