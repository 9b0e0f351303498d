//! Configuration for the aws-vars CLI.
//!
//! Settings are read from a TOML file. Every field has a default, so the file
//! is optional and may list only what differs:
//!
//! ```toml
//! [ssm]
//! region = "eu-west-1"
//! endpoint = "https://vpce-0123.ssm.eu-west-1.vpce.amazonaws.com"
//! timeout_seconds = 10
//!
//! [metadata]
//! enabled = true
//! endpoint = "http://169.254.169.254"
//! token_ttl_seconds = 60
//! timeout_seconds = 2
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use aws_client::{ImdsConfig, SsmConfig, DEFAULT_IMDS_ENDPOINT, DEFAULT_REGION};
use aws_vars_core::DEFAULT_TOKEN_TTL_SECONDS;
use serde::Deserialize;
use tracing::debug;

use crate::errors::Error;

/// Configuration file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILENAME: &str = "aws-vars.toml";

/// Environment variables consulted, in order, when no region is configured.
pub const REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Top-level CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub ssm: SsmSettings,
    pub metadata: MetadataSettings,
}

/// The `[ssm]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SsmSettings {
    /// Falls back to `AWS_REGION`, then `AWS_DEFAULT_REGION`, then `us-east-1`.
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SsmSettings {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            timeout_seconds: aws_client::DEFAULT_SSM_TIMEOUT.as_secs(),
        }
    }
}

/// The `[metadata]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataSettings {
    /// When false, localhost tags come from host variables only and
    /// credentials must come from the environment.
    pub enabled: bool,
    pub endpoint: String,
    pub token_ttl_seconds: u32,
    pub timeout_seconds: u64,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            timeout_seconds: aws_client::DEFAULT_IMDS_TIMEOUT.as_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read or
    /// does not match the expected layout.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read configuration file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse configuration file: {}", e)))?;

        if config.metadata.token_ttl_seconds == 0 {
            return Err(Error::Config(
                "metadata.token_ttl_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    /// Loads the explicit file if one is given, else `aws-vars.toml` from
    /// `working_dir` when present, else the defaults.
    pub fn load_or_default(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, Error> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = default_config_path(working_dir);
        if candidate.exists() {
            Self::load(&candidate)
        } else {
            debug!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Region to use, given a way to read environment variables.
    pub fn region(&self, lookup: impl Fn(&str) -> Option<String>) -> String {
        self.ssm
            .region
            .clone()
            .or_else(|| {
                REGION_ENV_VARS
                    .into_iter()
                    .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
            })
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    pub fn ssm_config(&self, lookup: impl Fn(&str) -> Option<String>) -> SsmConfig {
        let mut config = SsmConfig::new(self.region(lookup));
        config.endpoint = self.ssm.endpoint.clone();
        config.timeout = Duration::from_secs(self.ssm.timeout_seconds);
        config
    }

    pub fn imds_config(&self) -> ImdsConfig {
        ImdsConfig {
            endpoint: self.metadata.endpoint.clone(),
            timeout: Duration::from_secs(self.metadata.timeout_seconds),
        }
    }
}

pub fn default_config_path(working_dir: &Path) -> PathBuf {
    working_dir.join(DEFAULT_CONFIG_FILENAME)
}
