//! Host attributes used to build lookup paths.
//!
//! `PathComponents` holds the five attributes that the path templates refer to.
//! Three of them come from host tags (`Role`, `Environment`, `Cluster`) and two
//! from the host's own variables (`node_type`, `fqdn`).
//!
//! # Examples
//!
//! ```rust
//! use aws_vars_core::{HostTags, HostVars, PathComponents, PathField};
//! use serde_json::json;
//!
//! let mut tags = HostTags::new();
//! tags.insert("Role".to_string(), "mysql".to_string());
//!
//! let mut vars = HostVars::new();
//! vars.insert("fqdn".to_string(), json!("db1.prod.example.com"));
//!
//! let components = PathComponents::from_tags_and_vars(&tags, &vars);
//! assert_eq!(components.role(), "mysql");
//! assert_eq!(components.fqdn(), "db1_prod_example_com");
//! assert!(components.has_required(&[PathField::Role, PathField::Fqdn]));
//! assert!(!components.has_required(&[PathField::Cluster]));
//! ```

use crate::host::{scalar_text, HostTags, HostVars};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
#[path = "path_components_tests.rs"]
mod tests;

/// Tag holding the host role.
pub const TAG_ROLE: &str = "Role";

/// Tag holding the deployment environment.
pub const TAG_ENVIRONMENT: &str = "Environment";

/// Tag holding the cluster name.
pub const TAG_CLUSTER: &str = "Cluster";

/// Tags that feed `PathComponents`, in lookup order.
pub const PATH_TAGS: [&str; 3] = [TAG_ENVIRONMENT, TAG_ROLE, TAG_CLUSTER];

/// Host variable holding the node subtype within a cluster.
pub const VAR_NODE_TYPE: &str = "node_type";

/// Host variable holding the fully-qualified domain name.
pub const VAR_FQDN: &str = "fqdn";

/// A named field of [`PathComponents`].
///
/// Placeholders in path templates use the same names (`{role}`, `{node_type}`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathField {
    Role,
    Environment,
    Cluster,
    NodeType,
    Fqdn,
}

impl PathField {
    /// All fields in declaration order.
    pub const ALL: [PathField; 5] = [
        PathField::Role,
        PathField::Environment,
        PathField::Cluster,
        PathField::NodeType,
        PathField::Fqdn,
    ];

    /// The placeholder name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            PathField::Role => "role",
            PathField::Environment => "environment",
            PathField::Cluster => "cluster",
            PathField::NodeType => "node_type",
            PathField::Fqdn => "fqdn",
        }
    }
}

impl fmt::Display for PathField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name does not match any [`PathField`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown path component: {0}")]
pub struct UnknownPathField(pub String);

impl FromStr for PathField {
    type Err = UnknownPathField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PathField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownPathField(s.to_string()))
    }
}

/// The resolved attributes of one host, ready for path rendering.
///
/// Any field may be empty. An empty field disqualifies every template that
/// refers to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathComponents {
    role: String,
    environment: String,
    cluster: String,
    node_type: String,
    fqdn: String,
}

impl PathComponents {
    /// Creates components from already resolved values.
    ///
    /// `fqdn` is the raw name; it is sanitized with [`sanitize_fqdn`].
    pub fn new(
        role: impl Into<String>,
        environment: impl Into<String>,
        cluster: impl Into<String>,
        node_type: impl Into<String>,
        fqdn: &str,
    ) -> Self {
        Self {
            role: role.into(),
            environment: environment.into(),
            cluster: cluster.into(),
            node_type: node_type.into(),
            fqdn: sanitize_fqdn(fqdn),
        }
    }

    /// Builds components from host tags and host variables.
    ///
    /// `Role`, `Environment` and `Cluster` are read from `tags`; `node_type` and
    /// `fqdn` from `hostvars`. Numbers and booleans are rendered as text; missing
    /// values, null, arrays and objects become empty strings. This never fails.
    pub fn from_tags_and_vars(tags: &HostTags, hostvars: &HostVars) -> Self {
        let tag = |name: &str| tags.get(name).cloned().unwrap_or_default();

        Self::new(
            tag(TAG_ROLE),
            tag(TAG_ENVIRONMENT),
            tag(TAG_CLUSTER),
            text_var(hostvars, VAR_NODE_TYPE),
            &text_var(hostvars, VAR_FQDN),
        )
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// The sanitized fqdn (dots replaced by underscores).
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Returns the value of a field.
    pub fn get(&self, field: PathField) -> &str {
        match field {
            PathField::Role => &self.role,
            PathField::Environment => &self.environment,
            PathField::Cluster => &self.cluster,
            PathField::NodeType => &self.node_type,
            PathField::Fqdn => &self.fqdn,
        }
    }

    /// Returns `true` if every listed field is non-empty.
    pub fn has_required(&self, fields: &[PathField]) -> bool {
        fields.iter().all(|field| !self.get(*field).is_empty())
    }

    /// Like [`has_required`](Self::has_required) but takes field names.
    ///
    /// A name that matches no field counts as missing.
    pub fn has_required_named(&self, names: &[&str]) -> bool {
        names.iter().all(|name| {
            name.parse::<PathField>()
                .map(|field| !self.get(field).is_empty())
                .unwrap_or(false)
        })
    }

    /// Fields that are currently empty.
    pub fn missing_fields(&self) -> Vec<PathField> {
        PathField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_empty())
            .collect()
    }
}

impl fmt::Display for PathComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "role='{}', environment='{}', cluster='{}', node_type='{}', fqdn='{}'",
            self.role, self.environment, self.cluster, self.node_type, self.fqdn
        )
    }
}

/// Replaces every `.` in a fully-qualified name with `_`.
///
/// Total and idempotent.
pub fn sanitize_fqdn(raw: &str) -> String {
    raw.replace('.', "_")
}

fn text_var(hostvars: &HostVars, name: &str) -> String {
    hostvars.get(name).and_then(scalar_text).unwrap_or_default()
}
