//! Host variable resolution.
//!
//! This module implements the orchestration component. The `HostVarsResolver`
//! collects a host's tags, builds the lookup paths, runs the fetch and merge
//! engine against every configured store and reports precedence conflicts.
//!
//! # Architecture
//!
//! The resolver ties together:
//! - [`InstanceMetadataProvider`] for the tags of the local machine
//! - [`PathBuilder`] for the ordered lookup paths
//! - [`VariableMerger`] with one or more [`ParameterStore`]s
//!
//! # Usage
//!
//! ```rust,ignore
//! use aws_vars_core::{HostContext, HostVarsResolver};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let resolver = HostVarsResolver::new(Arc::new(ssm_store))
//!     .with_metadata_provider(Arc::new(imds_client));
//!
//! let host = HostContext::new("mysql-1", host_vars);
//! let extra_vars = resolver.resolve(&host).await;
//! # }
//! ```

use crate::{
    host::{HostContext, HostTags, HostVars},
    instance_metadata::{fetch_instance_tags, InstanceMetadataProvider, DEFAULT_TOKEN_TTL_SECONDS},
    merger::{ConflictRecord, MergeOutcome, VariableMerger},
    parameter_store::ParameterStore,
    path_builder::PathBuilder,
    path_components::{PathComponents, PATH_TAGS},
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// Everything one resolution pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Host name.
    pub host: String,

    /// `true` when the host asked to skip remote lookups.
    pub skipped: bool,

    /// Tags used to build the paths.
    pub tags: HostTags,

    /// Lookup paths, generic to specific.
    pub paths: Vec<String>,

    /// Merged remote variables (host variables excluded).
    pub values: HostVars,

    /// Remote values suppressed by host variables.
    pub conflicts: Vec<ConflictRecord>,
}

impl Resolution {
    fn skipped(host: &HostContext) -> Self {
        Self {
            host: host.name().to_string(),
            skipped: true,
            ..Self::default()
        }
    }
}

/// Resolves remote variables for hosts.
///
/// The resolver keeps no state between hosts except the cached metadata session
/// token, which is fetched once per instance and never refreshed.
pub struct HostVarsResolver {
    stores: Vec<Arc<dyn ParameterStore>>,
    metadata_provider: Option<Arc<dyn InstanceMetadataProvider>>,
    builder: PathBuilder<'static>,
    merger: VariableMerger,
    token_ttl_seconds: u32,
    metadata_token: Mutex<Option<String>>,
}

impl HostVarsResolver {
    /// Creates a resolver reading from `store`.
    ///
    /// Without a metadata provider, tags come from host variables only.
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            stores: vec![store],
            metadata_provider: None,
            builder: PathBuilder::new(),
            merger: VariableMerger::new(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            metadata_token: Mutex::new(None),
        }
    }

    /// Adds another store. Its values overlay those of the stores added before it.
    pub fn with_store(mut self, store: Arc<dyn ParameterStore>) -> Self {
        self.stores.push(store);
        self
    }

    /// Enables tag lookup through instance metadata for the local machine.
    pub fn with_metadata_provider(mut self, provider: Arc<dyn InstanceMetadataProvider>) -> Self {
        self.metadata_provider = Some(provider);
        self
    }

    /// Sets the lifetime requested for metadata session tokens.
    pub fn with_token_ttl(mut self, ttl_seconds: u32) -> Self {
        self.token_ttl_seconds = ttl_seconds;
        self
    }

    /// Resolves the remote variables of `host`.
    ///
    /// Never fails: every remote problem is logged and treated as "no data".
    /// The returned map never contains a variable the host already defines, so
    /// callers can layer it underneath the host variables.
    pub async fn resolve(&self, host: &HostContext) -> HostVars {
        self.resolve_with_report(host).await.values
    }

    /// Resolves the remote variables of `host` and reports how they were found.
    #[instrument(skip(self, host), fields(host = %host.name()))]
    pub async fn resolve_with_report(&self, host: &HostContext) -> Resolution {
        if host.skip_requested() {
            debug!(
                "Skipping AWS vars lookup for host {} due to skip_aws_vars",
                host.name()
            );
            return Resolution::skipped(host);
        }

        let tags = self.resolve_tags(host).await;
        let components = PathComponents::from_tags_and_vars(&tags, host.vars());
        let paths = self.builder.build_paths(&components);

        let mut resolution = Resolution {
            host: host.name().to_string(),
            skipped: false,
            tags,
            paths,
            ..Resolution::default()
        };

        if resolution.paths.is_empty() {
            debug!("No valid paths could be constructed for host {}", host.name());
            return resolution;
        }

        let mut outcome = MergeOutcome::default();
        for store in &self.stores {
            let merged = self
                .merger
                .fetch_and_merge(store.as_ref(), &resolution.paths, host.vars())
                .await;
            outcome.absorb(merged);
        }

        if outcome.has_conflicts() {
            let listed: Vec<String> = outcome.conflicts.iter().map(ToString::to_string).collect();
            warn!(
                host = %host.name(),
                conflict_count = listed.len(),
                "Host {} has variables in host_vars that override AWS variables: {}",
                host.name(),
                listed.join(", ")
            );
        }

        info!(
            host = %host.name(),
            path_count = resolution.paths.len(),
            variable_count = outcome.values.len(),
            conflict_count = outcome.conflicts.len(),
            "Resolved AWS variables"
        );

        resolution.values = outcome.values;
        resolution.conflicts = outcome.conflicts;
        resolution
    }

    /// Builds the lookup paths for `host` without reading any store.
    ///
    /// Returns no paths for hosts that set `skip_aws_vars`.
    pub async fn construct_paths(&self, host: &HostContext) -> Vec<String> {
        if host.skip_requested() {
            return Vec::new();
        }
        let tags = self.resolve_tags(host).await;
        let components = PathComponents::from_tags_and_vars(&tags, host.vars());
        self.builder.build_paths(&components)
    }

    /// Collects the `Role`, `Environment` and `Cluster` tags of `host`.
    ///
    /// Host variables come first; scalar values count, rendered as text. Tags
    /// still missing are read from instance metadata, but only when the host is
    /// the local machine. Tags that remain missing are logged and left out.
    pub async fn resolve_tags(&self, host: &HostContext) -> HostTags {
        let mut tags = HostTags::new();
        let mut missing: Vec<&str> = Vec::new();

        for name in PATH_TAGS {
            match host.text_var(name) {
                Some(value) => {
                    tags.insert(name.to_string(), value);
                }
                None => missing.push(name),
            }
        }

        if !missing.is_empty() && host.is_local() {
            if let Some(instance_tags) = self.instance_tags().await {
                missing.retain(|name| match instance_tags.get(*name) {
                    Some(value) => {
                        tags.insert(name.to_string(), value.clone());
                        false
                    }
                    None => true,
                });
            }
        }

        if !missing.is_empty() {
            debug!(
                "Host {} is missing required tags for AWS variable lookup: {}. \
                 Paths depending on them will be skipped",
                host.name(),
                missing.join(", ")
            );
            debug!(tags = ?tags, "Current tags found");
        }

        tags
    }

    async fn instance_tags(&self) -> Option<HostTags> {
        let provider = self.metadata_provider.as_ref()?;
        let token = self.metadata_token(provider.as_ref()).await?;

        match fetch_instance_tags(provider.as_ref(), &token).await {
            Ok(tags) => Some(tags),
            Err(err) => {
                debug!(error = %err, "Error accessing instance metadata service");
                None
            }
        }
    }

    async fn metadata_token(&self, provider: &dyn InstanceMetadataProvider) -> Option<String> {
        if let Some(token) = self.cached_token() {
            return Some(token);
        }

        match provider.get_token(self.token_ttl_seconds).await {
            Ok(token) => {
                *self
                    .metadata_token
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
                Some(token)
            }
            Err(err) => {
                debug!(error = %err, "Failed to get instance metadata token");
                None
            }
        }
    }

    fn cached_token(&self) -> Option<String> {
        self.metadata_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for HostVarsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.stores.iter().map(|s| s.source_label()).collect();
        f.debug_struct("HostVarsResolver")
            .field("sources", &sources)
            .field("metadata_provider", &self.metadata_provider.is_some())
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}
