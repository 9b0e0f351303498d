//! Remote parameter store interface.
//!
//! A parameter store lists the entries stored directly under a path. Listing is
//! paginated: callers keep passing the returned `next_token` until it is `None`.
//! Encrypted values are returned decrypted.

use crate::errors::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source label for AWS Systems Manager Parameter Store.
pub const SSM_SOURCE_LABEL: &str = "SSM";

/// One stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Full entry name, e.g. `/aws_vars/mysql/ansible_vars`.
    pub name: String,

    /// Entry value as stored (decrypted).
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPage {
    pub parameters: Vec<Parameter>,

    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

/// Abstract interface to a remote key-value parameter store.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// resolution the process performs.
///
/// # Examples
///
/// ```no_run
/// use aws_vars_core::ParameterStore;
///
/// async fn count_entries(store: &dyn ParameterStore, path: &str) -> usize {
///     let mut count = 0;
///     let mut token = None;
///     loop {
///         let page = store
///             .list_parameters(path, false, token.as_deref())
///             .await
///             .expect("listing failed");
///         count += page.parameters.len();
///         match page.next_token {
///             Some(next) => token = Some(next),
///             None => break,
///         }
///     }
///     count
/// }
/// ```
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Short label identifying the store in conflict records (`SSM`).
    fn source_label(&self) -> &str;

    /// Lists one page of entries under `path`.
    ///
    /// With `recursive == false` only entries exactly one level below `path`
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`](crate::StoreError) when the store cannot be
    /// reached, rejects the request or answers with an unreadable response.
    async fn list_parameters(
        &self,
        path: &str,
        recursive: bool,
        next_token: Option<&str>,
    ) -> StoreResult<ParameterPage>;
}
