//! Instance metadata interface.
//!
//! On the machine running the resolution, host tags can be read from the
//! instance metadata service. Access takes a short-lived session token obtained
//! through a local handshake; every tag request carries that token.

use crate::{errors::MetadataResult, host::HostTags};
use async_trait::async_trait;
use tracing::debug;

/// Lifetime requested for metadata session tokens, in seconds.
pub const DEFAULT_TOKEN_TTL_SECONDS: u32 = 60;

/// Abstract interface to the instance metadata service.
#[async_trait]
pub trait InstanceMetadataProvider: Send + Sync {
    /// Obtains a session token valid for `ttl_seconds`.
    async fn get_token(&self, ttl_seconds: u32) -> MetadataResult<String>;

    /// Lists the names of the tags attached to this instance.
    async fn list_tag_names(&self, token: &str) -> MetadataResult<Vec<String>>;

    /// Reads the value of one tag.
    async fn get_tag_value(&self, token: &str, name: &str) -> MetadataResult<String>;
}

/// Reads every tag of the instance.
///
/// Any failure aborts the whole read: callers get either all tags or an error,
/// never a partial map.
pub async fn fetch_instance_tags(
    provider: &dyn InstanceMetadataProvider,
    token: &str,
) -> MetadataResult<HostTags> {
    let names = provider.list_tag_names(token).await?;
    debug!(tag_count = names.len(), "Listed instance tags");

    let mut tags = HostTags::new();
    for name in names {
        let value = provider.get_tag_value(token, &name).await?;
        tags.insert(name, value);
    }

    Ok(tags)
}
