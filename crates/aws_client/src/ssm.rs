//! AWS Systems Manager Parameter Store client.
//!
//! Talks the AWS JSON 1.1 protocol directly: one signed `POST /` per page of
//! `GetParametersByPath`.

use crate::{
    credentials::{AwsCredentials, CredentialsProvider},
    imds::parse_base_url,
    sigv4::{self, SigningRequest, SigningScope, AMZ_DATE_HEADER, SECURITY_TOKEN_HEADER},
    Error,
};
use async_trait::async_trait;
use aws_vars_core::{
    Parameter, ParameterPage, ParameterStore, StoreError, StoreResult, SSM_SOURCE_LABEL,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

#[cfg(test)]
#[path = "ssm_tests.rs"]
mod tests;

pub const SSM_SERVICE: &str = "ssm";
pub const GET_PARAMETERS_BY_PATH_TARGET: &str = "AmazonSSM.GetParametersByPath";
pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
pub const TARGET_HEADER: &str = "x-amz-target";

/// Largest page size `GetParametersByPath` accepts.
pub const MAX_RESULTS: u32 = 10;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SSM_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for Parameter Store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsmConfig {
    pub region: String,

    /// Overrides the regional endpoint, e.g. for a VPC endpoint or a local mock.
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl SsmConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            timeout: DEFAULT_SSM_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://ssm.{}.amazonaws.com/", self.region))
    }
}

impl Default for SsmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetParametersByPathRequest<'a> {
    path: &'a str,
    recursive: bool,
    with_decryption: bool,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParametersByPathResponse {
    #[serde(default)]
    parameters: Vec<SsmParameter>,
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SsmParameter {
    name: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct AwsErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

impl AwsErrorBody {
    fn describe(self, fallback: &str) -> String {
        // `__type` may carry a namespace prefix: "com.amazonaws...#ThrottlingException"
        let error_type = self
            .error_type
            .map(|t| t.rsplit('#').next().unwrap_or_default().to_string());
        match (error_type, self.message) {
            (Some(t), Some(m)) => format!("{t}: {m}"),
            (Some(t), None) => t,
            (None, Some(m)) => m,
            (None, None) => fallback.to_string(),
        }
    }
}

/// Parameter Store client implementing [`ParameterStore`].
///
/// Credentials are resolved on the first request and reused afterwards.
pub struct SsmParameterStore {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    credentials_provider: CredentialsProvider,
    credentials: OnceCell<Arc<AwsCredentials>>,
}

impl SsmParameterStore {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] for an unusable endpoint, or
    /// [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SsmConfig, credentials_provider: CredentialsProvider) -> Result<Self, Error> {
        let endpoint = parse_base_url(&config.endpoint_url())?;
        if endpoint.host_str().is_none() {
            return Err(Error::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "missing host".to_string(),
            });
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            region: config.region.clone(),
            credentials_provider,
            credentials: OnceCell::new(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn credentials(&self) -> Result<&Arc<AwsCredentials>, Error> {
        self.credentials
            .get_or_try_init(|| self.credentials_provider.credentials())
            .await
    }

    fn host_header(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    fn signed_headers(
        &self,
        credentials: &AwsCredentials,
        target: &str,
        body: &[u8],
    ) -> Result<BTreeMap<String, String>, Error> {
        let scope = SigningScope {
            region: &self.region,
            service: SSM_SERVICE,
            time: Utc::now(),
        };

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("host".to_string(), self.host_header());
        headers.insert(AMZ_DATE_HEADER.to_string(), scope.amz_date());
        headers.insert(TARGET_HEADER.to_string(), target.to_string());
        if let Some(token) = credentials.session_token() {
            headers.insert(SECURITY_TOKEN_HEADER.to_string(), token.to_string());
        }

        let request = SigningRequest {
            method: "POST",
            canonical_uri: self.endpoint.path(),
            canonical_query: "",
            headers,
            payload: body,
        };
        let authorization = sigv4::authorization_header(credentials, &scope, &request)?;

        let mut headers = request.headers;
        // reqwest sets Host itself from the URL
        headers.remove("host");
        headers.insert("authorization".to_string(), authorization);
        Ok(headers)
    }

    /// Fetches one page of `GetParametersByPath`.
    #[instrument(skip(self), fields(region = %self.region))]
    pub async fn get_parameters_by_path(
        &self,
        path: &str,
        recursive: bool,
        next_token: Option<&str>,
    ) -> Result<ParameterPage, Error> {
        let credentials = self.credentials().await?;

        let body = serde_json::to_vec(&GetParametersByPathRequest {
            path,
            recursive,
            with_decryption: true,
            max_results: MAX_RESULTS,
            next_token,
        })?;
        let headers = self.signed_headers(credentials, GET_PARAMETERS_BY_PATH_TARGET, &body)?;

        let mut request = self.http.post(self.endpoint.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.body(body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let error_body: AwsErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                message: error_body.describe(status.canonical_reason().unwrap_or("error")),
            });
        }

        let parsed: GetParametersByPathResponse = serde_json::from_str(&text)?;
        debug!(
            parameter_count = parsed.parameters.len(),
            has_next = parsed.next_token.is_some(),
            "Received parameter page"
        );

        Ok(ParameterPage {
            parameters: parsed
                .parameters
                .into_iter()
                .map(|p| Parameter::new(p.name, p.value))
                .collect(),
            next_token: parsed.next_token.filter(|token| !token.is_empty()),
        })
    }
}

impl std::fmt::Debug for SsmParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsmParameterStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    fn source_label(&self) -> &str {
        SSM_SOURCE_LABEL
    }

    async fn list_parameters(
        &self,
        path: &str,
        recursive: bool,
        next_token: Option<&str>,
    ) -> StoreResult<ParameterPage> {
        self.get_parameters_by_path(path, recursive, next_token)
            .await
            .map_err(StoreError::from)
    }
}
