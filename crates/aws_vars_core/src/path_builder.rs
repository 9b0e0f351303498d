//! Rendering of path templates into concrete lookup paths.
//!
//! The builder walks the template catalog in precedence order and renders each
//! template against a [`PathComponents`] value. A template that cannot be fully
//! rendered is skipped with a debug log entry; it is never an error.
//!
//! # Examples
//!
//! ```rust
//! use aws_vars_core::{PathBuilder, PathComponents};
//!
//! let components = PathComponents::new("mysql", "", "", "", "");
//! let paths = PathBuilder::new().build_paths(&components);
//!
//! assert_eq!(
//!     paths,
//!     vec![
//!         "/aws_vars/ansible_vars".to_string(),
//!         "/aws_vars/mysql/ansible_vars".to_string(),
//!     ]
//! );
//! ```

use crate::{
    path_components::{PathComponents, PathField},
    path_patterns::{PathPattern, BASE_PATH, BASE_PATH_PLACEHOLDER, PATH_PATTERNS},
};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
#[path = "path_builder_tests.rs"]
mod tests;

/// Why a template was not turned into a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("required component '{0}' is missing or empty")]
    MissingComponent(PathField),

    #[error("placeholder '{0}' does not name a known component")]
    UnknownComponent(String),

    #[error("template has an unterminated placeholder")]
    UnterminatedPlaceholder,

    #[error("rendered path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// Renders path templates in precedence order.
///
/// The default builder uses the standard catalog, [`PATH_PATTERNS`].
#[derive(Debug, Clone, Copy)]
pub struct PathBuilder<'a> {
    patterns: &'a [PathPattern],
}

impl PathBuilder<'static> {
    /// Creates a builder over the standard template catalog.
    pub fn new() -> Self {
        Self {
            patterns: &PATH_PATTERNS,
        }
    }
}

impl Default for PathBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PathBuilder<'a> {
    /// Creates a builder over a custom, already ordered, template list.
    pub fn with_patterns(patterns: &'a [PathPattern]) -> Self {
        Self { patterns }
    }

    /// Builds every renderable path, from most generic to most specific.
    ///
    /// Templates referring to an empty component are skipped. The relative order
    /// of the surviving templates is preserved and nothing is deduplicated.
    pub fn build_paths(&self, components: &PathComponents) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.patterns.len());

        for pattern in self.patterns {
            match render(pattern, components) {
                Ok(path) => {
                    debug!(
                        tier = %pattern.tier,
                        path = %path,
                        description = pattern.description,
                        "Added lookup path"
                    );
                    paths.push(path);
                }
                Err(rejection) => {
                    debug!(
                        tier = %pattern.tier,
                        template = pattern.template,
                        description = pattern.description,
                        components = %components,
                        "Skipping path template because {}",
                        rejection
                    );
                }
            }
        }

        debug!(
            paths = ?paths,
            "Constructed paths in order of precedence (generic to specific)"
        );
        paths
    }
}

/// Renders one template.
///
/// Declared requirements are checked before any substitution. Placeholders that
/// the declaration missed are still checked while substituting, and a
/// placeholder naming no component rejects the template.
pub fn render(pattern: &PathPattern, components: &PathComponents) -> Result<String, PathRejection> {
    if let Some(missing) = pattern
        .requires
        .iter()
        .find(|field| components.get(**field).is_empty())
    {
        return Err(PathRejection::MissingComponent(*missing));
    }

    let path = substitute(pattern.template, components)?;

    let relative = path.strip_prefix('/').unwrap_or(&path);
    if relative.split('/').any(str::is_empty) {
        return Err(PathRejection::EmptySegment(path));
    }

    Ok(path)
}

fn substitute(template: &str, components: &PathComponents) -> Result<String, PathRejection> {
    let mut output = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or(PathRejection::UnterminatedPlaceholder)?;
        let name = &after[..end];

        if name == BASE_PATH_PLACEHOLDER {
            output.push_str(BASE_PATH);
        } else {
            let field: PathField = name
                .parse()
                .map_err(|_| PathRejection::UnknownComponent(name.to_string()))?;
            let value = components.get(field);
            if value.is_empty() {
                return Err(PathRejection::MissingComponent(field));
            }
            output.push_str(value);
        }

        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}
