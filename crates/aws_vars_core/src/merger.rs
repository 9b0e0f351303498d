//! Fetch and merge engine.
//!
//! For each lookup path, in order, the engine lists the entries stored directly
//! under the path, keeps the ones named `.../ansible_vars`, parses their values
//! as JSON objects and folds the keys into one map.
//!
//! # Precedence
//!
//! 1. **Host variables** always win. A fetched key that the host already defines
//!    is never written; a [`ConflictRecord`] is emitted instead.
//! 2. **Later paths** override earlier ones. Paths arrive ordered from generic to
//!    specific, so the most specific value survives.
//!
//! # Failure handling
//!
//! Nothing here fails the merge. A store error skips the rest of that path, a
//! malformed entry skips that entry, and both are logged at debug level.

use crate::{
    errors::StoreError,
    host::HostVars,
    parameter_store::{Parameter, ParameterStore},
    path_patterns::VARS_SUFFIX,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(test)]
#[path = "merger_tests.rs"]
mod tests;

/// A fetched value suppressed because the host already defines the variable.
///
/// Displays as `<source>:<path>:<variable>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictRecord {
    pub source: String,
    pub path: String,
    pub variable: String,
}

impl ConflictRecord {
    pub fn new(
        source: impl Into<String>,
        path: impl Into<String>,
        variable: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            variable: variable.into(),
        }
    }
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source, self.path, self.variable)
    }
}

/// Result of merging one or more stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    /// Merged variables; never contains a host variable name.
    pub values: HostVars,

    /// Suppressed values, in the order they were found.
    pub conflicts: Vec<ConflictRecord>,
}

impl MergeOutcome {
    /// Overlays another outcome on top of this one.
    ///
    /// Values from `later` replace values of the same name; conflicts are appended.
    pub fn absorb(&mut self, later: MergeOutcome) {
        self.values.extend(later.values);
        self.conflicts.extend(later.conflicts);
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Why a single entry contributed nothing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EntryRejection {
    #[error("name does not end with /ansible_vars")]
    NotVarsEntry,

    #[error("value is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("value is a JSON {0}, not a dictionary")]
    NotADictionary(&'static str),
}

/// Stateless fetch and merge engine.
#[derive(Debug, Clone, Default)]
pub struct VariableMerger {}

impl VariableMerger {
    pub fn new() -> Self {
        Self {}
    }

    /// Fetches every path from `store` and merges the results.
    ///
    /// Paths are processed strictly in the given order and every result page of
    /// a path is drained before the next path starts. Calling this twice with
    /// the same inputs against an unchanged store gives the same outcome.
    #[instrument(skip(self, store, paths, host_vars), fields(source = store.source_label(), path_count = paths.len()))]
    pub async fn fetch_and_merge(
        &self,
        store: &dyn ParameterStore,
        paths: &[String],
        host_vars: &HostVars,
    ) -> MergeOutcome {
        let source = store.source_label().to_string();
        let mut outcome = MergeOutcome::default();

        for path in paths {
            if let Err(err) = self
                .merge_path(store, &source, path, host_vars, &mut outcome)
                .await
            {
                debug!(
                    source = %source,
                    path = %path,
                    error = %err,
                    "Error getting {} parameters for path {}, continuing with next path",
                    source,
                    path
                );
            }
        }

        outcome
    }

    async fn merge_path(
        &self,
        store: &dyn ParameterStore,
        source: &str,
        path: &str,
        host_vars: &HostVars,
        outcome: &mut MergeOutcome,
    ) -> Result<(), StoreError> {
        let mut next_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();

        loop {
            let page = store
                .list_parameters(path, false, next_token.as_deref())
                .await?;

            for parameter in &page.parameters {
                if let Err(rejection) = self.merge_entry(source, path, parameter, host_vars, outcome)
                {
                    if rejection != EntryRejection::NotVarsEntry {
                        debug!(
                            source = source,
                            parameter = %parameter.name,
                            "{} parameter '{}' skipped: {}",
                            source,
                            parameter.name,
                            rejection
                        );
                    }
                }
            }

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    debug!(
                        path = path,
                        "Store returned an already seen page token, stopping pagination"
                    );
                    return Ok(());
                }
                Some(token) => next_token = Some(token),
                None => return Ok(()),
            }
        }
    }

    /// Merges a single entry found under `path`.
    ///
    /// Returns the number of keys written. Each key is checked against the host
    /// variables before it is written.
    pub fn merge_entry(
        &self,
        source: &str,
        path: &str,
        parameter: &Parameter,
        host_vars: &HostVars,
        outcome: &mut MergeOutcome,
    ) -> Result<usize, EntryRejection> {
        if !parameter.name.ends_with(VARS_SUFFIX) {
            return Err(EntryRejection::NotVarsEntry);
        }

        let parsed: Value = serde_json::from_str(&parameter.value)
            .map_err(|e| EntryRejection::InvalidJson(e.to_string()))?;

        let entries = match parsed {
            Value::Object(entries) => entries,
            other => return Err(EntryRejection::NotADictionary(json_kind(&other))),
        };

        let mut written = 0;
        for (name, value) in entries {
            if host_vars.contains_key(&name) {
                debug!(
                    variable = %name,
                    path = path,
                    "Parameter '{}' from path '{}' exists in host_vars, using host_vars value",
                    name,
                    path
                );
                outcome
                    .conflicts
                    .push(ConflictRecord::new(source, path, name));
                continue;
            }

            debug!(variable = %name, path = path, "Setting/updating '{}' from {} path", name, source);
            outcome.values.insert(name, value);
            written += 1;
        }

        Ok(written)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
