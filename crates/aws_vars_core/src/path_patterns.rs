//! The catalog of lookup path templates.
//!
//! Templates are grouped into three tiers that are processed in a fixed order.
//! Within a tier, array order is precedence order: each template is more
//! specific than the one before it.
//!
//! ```text
//! BASE         /aws_vars/ansible_vars
//!              /aws_vars/{role}/ansible_vars
//! GLOBAL       /aws_vars/{role}/global/{cluster}/ansible_vars
//!              /aws_vars/{role}/global/{cluster}/{node_type}/ansible_vars
//! ENVIRONMENT  /aws_vars/{role}/{environment}/ansible_vars
//!              /aws_vars/{role}/{environment}/{cluster}/ansible_vars
//!              /aws_vars/{role}/{environment}/{cluster}/{node_type}/ansible_vars
//!              /aws_vars/{role}/{environment}/{cluster}/{fqdn}/ansible_vars
//! ```
//!
//! These strings address data that already exists in parameter stores and must
//! not change.

use crate::path_components::PathField;
use serde::Serialize;
use std::fmt;

#[cfg(test)]
#[path = "path_patterns_tests.rs"]
mod tests;

/// Root prefix of every lookup path.
pub const BASE_PATH: &str = "/aws_vars";

/// Placeholder that expands to [`BASE_PATH`].
pub const BASE_PATH_PLACEHOLDER: &str = "BASE_PATH";

/// Suffix that every consumed entry name must end with.
pub const VARS_SUFFIX: &str = "/ansible_vars";

/// Precedence tier of a path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PathTier {
    /// Organization-wide and role-wide variables.
    Base,
    /// Cluster variables shared by all environments.
    Global,
    /// Environment-scoped variables.
    Environment,
}

impl PathTier {
    /// Tiers in processing order.
    pub const ALL: [PathTier; 3] = [PathTier::Base, PathTier::Global, PathTier::Environment];

    pub fn as_str(&self) -> &'static str {
        match self {
            PathTier::Base => "BASE",
            PathTier::Global => "GLOBAL",
            PathTier::Environment => "ENVIRONMENT",
        }
    }
}

impl fmt::Display for PathTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One path template.
///
/// `requires` lists every component the template substitutes. The builder checks
/// it before rendering so that a template is never half-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathPattern {
    pub tier: PathTier,
    pub template: &'static str,
    pub description: &'static str,
    pub requires: &'static [PathField],
}

/// All templates, in precedence order (generic to specific).
pub static PATH_PATTERNS: [PathPattern; 8] = [
    PathPattern {
        tier: PathTier::Base,
        template: "{BASE_PATH}/ansible_vars",
        description: "Global variables",
        requires: &[],
    },
    PathPattern {
        tier: PathTier::Base,
        template: "{BASE_PATH}/{role}/ansible_vars",
        description: "Role-specific variables",
        requires: &[PathField::Role],
    },
    PathPattern {
        tier: PathTier::Global,
        template: "{BASE_PATH}/{role}/global/{cluster}/ansible_vars",
        description: "Global cluster variables",
        requires: &[PathField::Role, PathField::Cluster],
    },
    PathPattern {
        tier: PathTier::Global,
        template: "{BASE_PATH}/{role}/global/{cluster}/{node_type}/ansible_vars",
        description: "Global cluster node type variables",
        requires: &[PathField::Role, PathField::Cluster, PathField::NodeType],
    },
    PathPattern {
        tier: PathTier::Environment,
        template: "{BASE_PATH}/{role}/{environment}/ansible_vars",
        description: "Environment variables",
        requires: &[PathField::Role, PathField::Environment],
    },
    PathPattern {
        tier: PathTier::Environment,
        template: "{BASE_PATH}/{role}/{environment}/{cluster}/ansible_vars",
        description: "Environment cluster variables",
        requires: &[PathField::Role, PathField::Environment, PathField::Cluster],
    },
    PathPattern {
        tier: PathTier::Environment,
        template: "{BASE_PATH}/{role}/{environment}/{cluster}/{node_type}/ansible_vars",
        description: "Environment cluster node type variables",
        requires: &[
            PathField::Role,
            PathField::Environment,
            PathField::Cluster,
            PathField::NodeType,
        ],
    },
    PathPattern {
        tier: PathTier::Environment,
        template: "{BASE_PATH}/{role}/{environment}/{cluster}/{fqdn}/ansible_vars",
        description: "Host-specific variables",
        requires: &[
            PathField::Role,
            PathField::Environment,
            PathField::Cluster,
            PathField::Fqdn,
        ],
    },
];

/// Returns the templates of one tier, in order.
pub fn patterns_for(tier: PathTier) -> impl Iterator<Item = &'static PathPattern> {
    PATH_PATTERNS.iter().filter(move |pattern| pattern.tier == tier)
}

/// Extracts the placeholder names of a template, in order of appearance.
///
/// An unterminated `{` ends the scan; the builder rejects such templates when
/// it finds a leftover brace.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}
