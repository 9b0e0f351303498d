//! Command implementations for the aws-vars CLI.
//!
//! - `resolve_cmd`: resolve and print the remote variables of a host
//! - `paths_cmd`: print the lookup paths of a host without fetching anything

use std::{
    fs,
    io::{Read, Write},
    path::Path,
    sync::Arc,
};

use aws_client::{CredentialsProvider, ImdsClient, SsmParameterStore};
use aws_vars_core::{HostContext, HostVars, HostVarsResolver};
use clap::{Args, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{config::AppConfig, errors::Error};

pub mod paths_cmd;
pub mod resolve_cmd;

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

/// Host selection shared by the commands.
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Inventory name of the host (`localhost` enables instance tag lookup)
    #[arg(long)]
    pub host: String,

    /// JSON file with the host's variables, e.g. from `ansible-inventory --host`.
    /// Read from stdin when omitted.
    #[arg(long)]
    pub vars: Option<std::path::PathBuf>,
}

impl HostArgs {
    /// Builds the host context, reading variables from the file or `stdin`.
    pub fn host_context(&self, stdin: impl Read) -> Result<HostContext, Error> {
        let vars = match &self.vars {
            Some(path) => read_host_vars_file(path)?,
            None => read_host_vars(stdin)?,
        };
        Ok(HostContext::new(self.host.clone(), vars))
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single-line JSON
    #[default]
    Json,

    /// Indented JSON
    Pretty,
}

pub fn read_host_vars_file(path: &Path) -> Result<HostVars, Error> {
    let file = fs::File::open(path).map_err(Error::ReadInput)?;
    read_host_vars(file)
}

/// Parses host variables from a reader.
///
/// Empty input means no variables. Anything else must be a JSON object.
pub fn read_host_vars(mut reader: impl Read) -> Result<HostVars, Error> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(Error::ReadInput)?;

    if content.trim().is_empty() {
        debug!("No host variables given");
        return Ok(HostVars::new());
    }

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(vars)) => Ok(vars),
        Ok(other) => Err(Error::InvalidHostVars(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(Error::InvalidHostVars(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Writes `value` as JSON followed by a newline.
pub fn write_json<T: Serialize>(
    out: &mut impl Write,
    value: &T,
    format: OutputFormat,
) -> Result<(), Error> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .map_err(|e| Error::WriteOutput(e.into()))?;

    writeln!(out, "{rendered}").map_err(Error::WriteOutput)
}

/// Builds the resolver backed by Parameter Store and, unless disabled, the
/// instance metadata service.
pub fn build_resolver(
    config: &AppConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<HostVarsResolver, Error> {
    let imds = if config.metadata.enabled {
        Some(Arc::new(ImdsClient::new(&config.imds_config())?))
    } else {
        None
    };

    let ssm_config = config.ssm_config(env);
    debug!(
        region = %ssm_config.region,
        endpoint = %ssm_config.endpoint_url(),
        metadata_enabled = config.metadata.enabled,
        "Building resolver"
    );

    let credentials = CredentialsProvider::Default { imds: imds.clone() };
    let store = SsmParameterStore::new(&ssm_config, credentials)?;

    let mut resolver = HostVarsResolver::new(Arc::new(store))
        .with_token_ttl(config.metadata.token_ttl_seconds);
    if let Some(imds) = imds {
        resolver = resolver.with_metadata_provider(imds);
    }

    Ok(resolver)
}
