//! The host being resolved.
//!
//! A [`HostContext`] carries the host name and the host's own inventory variables.
//! The variable mapping is opaque to this crate apart from a handful of
//! well-known keys (tags, `node_type`, `fqdn`, `skip_aws_vars`).

use serde_json::Value;
use std::collections::BTreeMap;

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;

/// Host variables: the host's own inventory data.
pub type HostVars = serde_json::Map<String, Value>;

/// Tag name to tag value.
pub type HostTags = BTreeMap<String, String>;

/// Host variable that disables all remote lookups for a host.
pub const SKIP_FLAG: &str = "skip_aws_vars";

/// Host names that identify the machine running the resolution.
pub const LOCAL_HOST_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// A host and its own variables.
#[derive(Debug, Clone, PartialEq)]
pub struct HostContext {
    name: String,
    vars: HostVars,
}

impl HostContext {
    pub fn new(name: impl Into<String>, vars: HostVars) -> Self {
        Self {
            name: name.into(),
            vars,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vars(&self) -> &HostVars {
        &self.vars
    }

    /// Returns `true` when the host is the local machine.
    ///
    /// Only the local machine may query instance metadata for its tags.
    pub fn is_local(&self) -> bool {
        LOCAL_HOST_NAMES.contains(&self.name.as_str())
    }

    /// Returns `true` when the host asks to skip all remote lookups.
    ///
    /// Accepts JSON `true`, any non-zero number and the strings `true`, `yes`,
    /// `on` and `1` in any case. A missing flag means "do not skip".
    pub fn skip_requested(&self) -> bool {
        self.vars.get(SKIP_FLAG).is_some_and(is_truthy)
    }

    /// Looks up a string-valued host variable.
    pub fn string_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).and_then(Value::as_str)
    }

    /// Looks up a scalar host variable as text.
    ///
    /// See [`scalar_text`] for which values count.
    pub fn text_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).and_then(scalar_text)
    }
}

/// Renders a scalar JSON value as path text.
///
/// Strings are taken as is, numbers and booleans in their JSON form
/// (`2`, `1.5`, `true`). Null, arrays and objects have no text.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "on" | "1"
        ),
        _ => false,
    }
}
