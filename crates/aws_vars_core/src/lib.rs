//! Hierarchical remote host variables.
//!
//! This crate resolves the remote variables of an inventory host. It builds an
//! ordered list of lookup paths from the host's role, environment, cluster, node
//! type and fqdn, reads the `ansible_vars` entries stored under each path and
//! merges them so that:
//!
//! - more specific paths override more generic ones, and
//! - the host's own variables override everything fetched.
//!
//! ```text
//! /aws_vars/ansible_vars                                   (most generic)
//! /aws_vars/{role}/ansible_vars
//! /aws_vars/{role}/global/{cluster}/ansible_vars
//! /aws_vars/{role}/global/{cluster}/{node_type}/ansible_vars
//! /aws_vars/{role}/{environment}/ansible_vars
//! /aws_vars/{role}/{environment}/{cluster}/ansible_vars
//! /aws_vars/{role}/{environment}/{cluster}/{node_type}/ansible_vars
//! /aws_vars/{role}/{environment}/{cluster}/{fqdn}/ansible_vars  (most specific)
//! ```
//!
//! Remote stores and the instance metadata service are reached through the
//! [`ParameterStore`] and [`InstanceMetadataProvider`] traits; the `aws_client`
//! crate provides the AWS implementations.

pub mod errors;
pub mod host;
pub mod instance_metadata;
pub mod merger;
pub mod parameter_store;
pub mod path_builder;
pub mod path_components;
pub mod path_patterns;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use errors::{MetadataError, MetadataResult, StoreError, StoreResult};
pub use host::{scalar_text, HostContext, HostTags, HostVars, LOCAL_HOST_NAMES, SKIP_FLAG};
pub use instance_metadata::{
    fetch_instance_tags, InstanceMetadataProvider, DEFAULT_TOKEN_TTL_SECONDS,
};
pub use merger::{ConflictRecord, EntryRejection, MergeOutcome, VariableMerger};
pub use parameter_store::{Parameter, ParameterPage, ParameterStore, SSM_SOURCE_LABEL};
pub use path_builder::{PathBuilder, PathRejection};
pub use path_components::{sanitize_fqdn, PathComponents, PathField};
pub use path_patterns::{PathPattern, PathTier, BASE_PATH, PATH_PATTERNS, VARS_SUFFIX};
pub use resolver::{HostVarsResolver, Resolution};
