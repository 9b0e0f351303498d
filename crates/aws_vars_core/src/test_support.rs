//! Recording mocks shared by the unit tests of this crate.

use crate::{
    errors::{MetadataError, MetadataResult, StoreError, StoreResult},
    instance_metadata::InstanceMetadataProvider,
    parameter_store::{Parameter, ParameterPage, ParameterStore, SSM_SOURCE_LABEL},
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

type PageResult = Result<Vec<Parameter>, StoreError>;

/// In-memory parameter store that records every listing call.
///
/// Each path maps to a list of pages; page tokens are the page index.
#[derive(Debug, Clone, Default)]
pub struct MockParameterStore {
    label: String,
    pages: HashMap<String, Vec<PageResult>>,
    cyclic: HashSet<String>,
    calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl MockParameterStore {
    pub fn new() -> Self {
        Self::with_label(SSM_SOURCE_LABEL)
    }

    pub fn with_label(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    /// Adds an entry to the first page of `path`.
    pub fn with_entry(mut self, path: &str, name: &str, value: &str) -> Self {
        let pages = self.pages.entry(path.to_string()).or_default();
        if pages.is_empty() {
            pages.push(Ok(Vec::new()));
        }
        if let Some(Ok(first)) = pages.first_mut() {
            first.push(Parameter::new(name, value));
        }
        self
    }

    /// Adds a vars entry listed under `path` and named like the path itself.
    pub fn with_vars(self, path: &str, value: serde_json::Value) -> Self {
        self.with_entry(path, path, &value.to_string())
    }

    /// Appends a page of entries to `path`.
    pub fn with_page(mut self, path: &str, entries: Vec<Parameter>) -> Self {
        self.pages
            .entry(path.to_string())
            .or_default()
            .push(Ok(entries));
        self
    }

    /// Appends a failing page to `path`.
    pub fn with_failing_page(mut self, path: &str, error: StoreError) -> Self {
        self.pages
            .entry(path.to_string())
            .or_default()
            .push(Err(error));
        self
    }

    /// Makes the last page of `path` point back at the second page.
    pub fn with_token_cycle(mut self, path: &str) -> Self {
        self.cyclic.insert(path.to_string());
        self
    }

    /// Every `(path, token)` the store was asked for, in order.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ParameterStore for MockParameterStore {
    fn source_label(&self) -> &str {
        &self.label
    }

    async fn list_parameters(
        &self,
        path: &str,
        _recursive: bool,
        next_token: Option<&str>,
    ) -> StoreResult<ParameterPage> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), next_token.map(str::to_string)));

        let index: usize = next_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let Some(pages) = self.pages.get(path) else {
            return Ok(ParameterPage::default());
        };

        let parameters = match pages.get(index) {
            Some(Ok(parameters)) => parameters.clone(),
            Some(Err(error)) => return Err(error.clone()),
            None => Vec::new(),
        };
        let next_token = if index + 1 < pages.len() {
            Some((index + 1).to_string())
        } else if self.cyclic.contains(path) && pages.len() > 1 {
            Some("1".to_string())
        } else {
            None
        };

        Ok(ParameterPage {
            parameters,
            next_token,
        })
    }
}

/// Instance metadata provider backed by a fixed tag map.
#[derive(Debug, Clone, Default)]
pub struct MockMetadataProvider {
    tags: BTreeMap<String, String>,
    fail_token: bool,
    fail_tag: Option<String>,
    token_calls: Arc<Mutex<usize>>,
    tag_calls: Arc<Mutex<Vec<String>>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_token_failure(mut self) -> Self {
        self.fail_token = true;
        self
    }

    pub fn with_failing_tag(mut self, name: &str) -> Self {
        self.fail_tag = Some(name.to_string());
        self
    }

    pub fn token_calls(&self) -> usize {
        *self.token_calls.lock().unwrap()
    }

    /// Every tag value lookup, in order.
    pub fn tag_calls(&self) -> Vec<String> {
        self.tag_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.token_calls() + self.tag_calls().len()
    }
}

#[async_trait]
impl InstanceMetadataProvider for MockMetadataProvider {
    async fn get_token(&self, _ttl_seconds: u32) -> MetadataResult<String> {
        *self.token_calls.lock().unwrap() += 1;
        if self.fail_token {
            return Err(MetadataError::Transport {
                reason: "connection refused".to_string(),
            });
        }
        Ok("mock-token".to_string())
    }

    async fn list_tag_names(&self, token: &str) -> MetadataResult<Vec<String>> {
        assert_eq!(token, "mock-token");
        Ok(self.tags.keys().cloned().collect())
    }

    async fn get_tag_value(&self, token: &str, name: &str) -> MetadataResult<String> {
        assert_eq!(token, "mock-token");
        self.tag_calls.lock().unwrap().push(name.to_string());
        if self.fail_tag.as_deref() == Some(name) {
            return Err(MetadataError::HttpStatus {
                status: 500,
                path: format!("/latest/meta-data/tags/instance/{name}"),
            });
        }
        self.tags
            .get(name)
            .cloned()
            .ok_or_else(|| MetadataError::HttpStatus {
                status: 404,
                path: format!("/latest/meta-data/tags/instance/{name}"),
            })
    }
}
