//! Tests for host variable resolution.

use super::*;
use crate::test_support::{MockMetadataProvider, MockParameterStore};
use serde_json::{json, Value};
use tracing_test::traced_test;

const ROLE_PATH: &str = "/aws_vars/mysql/ansible_vars";

fn host(name: &str, vars: Value) -> HostContext {
    HostContext::new(name, vars.as_object().cloned().unwrap_or_default())
}

fn mysql_host(extra: Value) -> HostContext {
    let mut vars = json!({
        "Role": "mysql",
        "Environment": "prod",
        "Cluster": "primary",
        "node_type": "master",
        "fqdn": "mysql1.prod.example.com"
    });
    if let (Some(base), Some(extra)) = (vars.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    host("mysql-1", vars)
}

fn resolver_for(store: &MockParameterStore) -> HostVarsResolver {
    HostVarsResolver::new(Arc::new(store.clone()))
}

#[tokio::test]
async fn end_to_end_single_entry() {
    let store = MockParameterStore::new().with_vars(ROLE_PATH, json!({ "mysql_port": 3306 }));
    let resolver = resolver_for(&store);

    let resolution = resolver.resolve_with_report(&mysql_host(json!({}))).await;

    assert_eq!(
        resolution.paths,
        vec![
            "/aws_vars/ansible_vars",
            "/aws_vars/mysql/ansible_vars",
            "/aws_vars/mysql/global/primary/ansible_vars",
            "/aws_vars/mysql/global/primary/master/ansible_vars",
            "/aws_vars/mysql/prod/ansible_vars",
            "/aws_vars/mysql/prod/primary/ansible_vars",
            "/aws_vars/mysql/prod/primary/master/ansible_vars",
            "/aws_vars/mysql/prod/primary/mysql1_prod_example_com/ansible_vars",
        ]
    );
    assert_eq!(Value::Object(resolution.values), json!({ "mysql_port": 3306 }));
    assert!(resolution.conflicts.is_empty());
    assert!(!resolution.skipped);
    assert_eq!(store.call_count(), 8);
}

#[tokio::test]
#[traced_test]
async fn end_to_end_host_var_conflict() {
    let store = MockParameterStore::new().with_vars(ROLE_PATH, json!({ "mysql_port": 3306 }));
    let resolver = resolver_for(&store);

    let resolution = resolver
        .resolve_with_report(&mysql_host(json!({ "mysql_port": 3307 })))
        .await;

    assert!(!resolution.values.contains_key("mysql_port"));
    assert_eq!(
        resolution
            .conflicts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        vec!["SSM:/aws_vars/mysql/ansible_vars:mysql_port"]
    );
    assert!(logs_contain(
        "Host mysql-1 has variables in host_vars that override AWS variables: \
         SSM:/aws_vars/mysql/ansible_vars:mysql_port"
    ));
}

#[tokio::test]
async fn end_to_end_role_only_host() {
    let store = MockParameterStore::new();
    let resolver = resolver_for(&store);

    let resolution = resolver
        .resolve_with_report(&host("db-7", json!({ "Role": "mysql" })))
        .await;

    assert_eq!(
        resolution.paths,
        vec!["/aws_vars/ansible_vars", "/aws_vars/mysql/ansible_vars"]
    );
    assert_eq!(store.call_count(), 2);
}

#[tokio::test]
async fn skip_flag_returns_empty_without_remote_calls() {
    let store = MockParameterStore::new().with_vars(ROLE_PATH, json!({ "mysql_port": 3306 }));
    let metadata = MockMetadataProvider::new().with_tag("Role", "mysql");
    let resolver =
        resolver_for(&store).with_metadata_provider(Arc::new(metadata.clone()));

    let skip_host = host(
        "localhost",
        json!({ "skip_aws_vars": true, "Environment": "prod" }),
    );
    let result = resolver.resolve(&skip_host).await;

    assert!(result.is_empty());
    assert_eq!(store.call_count(), 0);
    assert_eq!(metadata.total_calls(), 0);

    let resolution = resolver.resolve_with_report(&skip_host).await;
    assert!(resolution.skipped);
    assert!(resolution.paths.is_empty());
}

#[tokio::test]
async fn skip_flag_false_still_resolves() {
    let store = MockParameterStore::new().with_vars(ROLE_PATH, json!({ "mysql_port": 3306 }));
    let resolver = resolver_for(&store);

    let result = resolver
        .resolve(&mysql_host(json!({ "skip_aws_vars": false })))
        .await;

    assert_eq!(Value::Object(result), json!({ "mysql_port": 3306 }));
    assert!(store.call_count() > 0);
}

#[tokio::test]
async fn returned_map_never_contains_host_vars() {
    let store = MockParameterStore::new()
        .with_vars("/aws_vars/ansible_vars", json!({ "fqdn": "remote", "Role": "remote" }))
        .with_vars(ROLE_PATH, json!({ "node_type": "replica", "extra": 1 }));
    let resolver = resolver_for(&store);
    let host = mysql_host(json!({}));

    let result = resolver.resolve(&host).await;

    for key in host.vars().keys() {
        assert!(!result.contains_key(key), "{key} leaked into the result");
    }
    assert_eq!(Value::Object(result), json!({ "extra": 1 }));
}

#[tokio::test]
async fn localhost_reads_missing_tags_from_instance_metadata() {
    let store = MockParameterStore::new();
    let metadata = MockMetadataProvider::new()
        .with_tag("Role", "web")
        .with_tag("Environment", "staging")
        .with_tag("Name", "web-1");
    let resolver = resolver_for(&store).with_metadata_provider(Arc::new(metadata.clone()));

    let tags = resolver
        .resolve_tags(&host("localhost", json!({ "Cluster": "blue" })))
        .await;

    assert_eq!(tags.get("Role").map(String::as_str), Some("web"));
    assert_eq!(tags.get("Environment").map(String::as_str), Some("staging"));
    assert_eq!(tags.get("Cluster").map(String::as_str), Some("blue"));
    assert!(!tags.contains_key("Name"));
}

#[tokio::test]
async fn host_var_tags_take_priority_over_metadata() {
    let metadata = MockMetadataProvider::new()
        .with_tag("Role", "from-metadata")
        .with_tag("Environment", "prod");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata));

    let tags = resolver
        .resolve_tags(&host("127.0.0.1", json!({ "Role": "from-vars" })))
        .await;

    assert_eq!(tags.get("Role").map(String::as_str), Some("from-vars"));
    assert_eq!(tags.get("Environment").map(String::as_str), Some("prod"));
}

#[tokio::test]
async fn remote_hosts_never_query_metadata() {
    let metadata = MockMetadataProvider::new().with_tag("Role", "web");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata.clone()));

    let tags = resolver.resolve_tags(&host("web-1", json!({}))).await;

    assert!(tags.is_empty());
    assert_eq!(metadata.total_calls(), 0);
}

#[tokio::test]
async fn complete_tags_skip_metadata_even_on_localhost() {
    let metadata = MockMetadataProvider::new().with_tag("Role", "web");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata.clone()));

    resolver
        .resolve_tags(&host(
            "localhost",
            json!({ "Role": "a", "Environment": "b", "Cluster": "c" }),
        ))
        .await;

    assert_eq!(metadata.total_calls(), 0);
}

#[tokio::test]
async fn metadata_token_is_fetched_once_per_resolver() {
    let metadata = MockMetadataProvider::new().with_tag("Role", "web");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata.clone()));
    let local = host("localhost", json!({}));

    resolver.resolve(&local).await;
    resolver.resolve(&local).await;
    resolver.construct_paths(&local).await;

    assert_eq!(metadata.token_calls(), 1);
    assert_eq!(metadata.tag_calls().len(), 3);
}

#[tokio::test]
#[traced_test]
async fn failing_tag_lookup_yields_no_metadata_tags() {
    let metadata = MockMetadataProvider::new()
        .with_tag("Cluster", "blue")
        .with_tag("Role", "web")
        .with_failing_tag("Role");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata));

    let tags = resolver.resolve_tags(&host("localhost", json!({}))).await;

    assert!(tags.is_empty(), "partial metadata must be discarded: {tags:?}");
    assert!(logs_contain("Error accessing instance metadata service"));
    assert!(logs_contain("missing required tags"));
}

#[tokio::test]
async fn token_failure_is_not_cached() {
    let metadata = MockMetadataProvider::new().with_token_failure();
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata.clone()));
    let local = host("localhost", json!({}));

    assert!(resolver.resolve_tags(&local).await.is_empty());
    assert!(resolver.resolve_tags(&local).await.is_empty());

    assert_eq!(metadata.token_calls(), 2);
    assert!(metadata.tag_calls().is_empty());
}

#[tokio::test]
async fn localhost_without_provider_uses_host_vars_only() {
    let store = MockParameterStore::new();
    let resolver = resolver_for(&store);

    let resolution = resolver
        .resolve_with_report(&host("localhost", json!({ "Role": "bastion" })))
        .await;

    assert_eq!(
        resolution.paths,
        vec!["/aws_vars/ansible_vars", "/aws_vars/bastion/ansible_vars"]
    );
}

#[tokio::test]
async fn later_stores_overlay_earlier_stores() {
    let ssm = MockParameterStore::new().with_vars(ROLE_PATH, json!({ "a": "ssm", "b": "ssm" }));
    let other = MockParameterStore::with_label("ASM")
        .with_vars(ROLE_PATH, json!({ "b": "asm", "secret": "x" }));
    let resolver = resolver_for(&ssm).with_store(Arc::new(other.clone()));

    let resolution = resolver
        .resolve_with_report(&mysql_host(json!({ "secret": "local" })))
        .await;

    assert_eq!(
        Value::Object(resolution.values),
        json!({ "a": "ssm", "b": "asm" })
    );
    assert_eq!(
        resolution.conflicts,
        vec![ConflictRecord::new("ASM", ROLE_PATH, "secret")]
    );
    assert_eq!(other.call_count(), 8);
}

#[tokio::test]
async fn construct_paths_does_not_touch_the_store() {
    let store = MockParameterStore::new();
    let resolver = resolver_for(&store);

    let paths = resolver.construct_paths(&mysql_host(json!({}))).await;

    assert_eq!(paths.len(), 8);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn store_failure_still_returns_a_map() {
    let store = MockParameterStore::new()
        .with_failing_page(
            "/aws_vars/ansible_vars",
            crate::StoreError::Transport {
                reason: "timed out".to_string(),
            },
        )
        .with_vars(ROLE_PATH, json!({ "mysql_port": 3306 }));
    let resolver = resolver_for(&store);

    let result = resolver.resolve(&mysql_host(json!({}))).await;

    assert_eq!(Value::Object(result), json!({ "mysql_port": 3306 }));
}

#[test]
fn debug_output_lists_sources() {
    let resolver = resolver_for(&MockParameterStore::new());
    let rendered = format!("{resolver:?}");
    assert!(rendered.contains("HostVarsResolver"));
    assert!(rendered.contains("SSM"));
}

#[tokio::test]
async fn numeric_host_var_tags_are_used_in_paths() {
    let resolver = resolver_for(&MockParameterStore::new());

    let paths = resolver
        .construct_paths(&host(
            "db-2",
            json!({ "Role": "mysql", "Environment": "prod", "Cluster": 2, "node_type": 1 }),
        ))
        .await;

    assert_eq!(
        paths,
        vec![
            "/aws_vars/ansible_vars",
            "/aws_vars/mysql/ansible_vars",
            "/aws_vars/mysql/global/2/ansible_vars",
            "/aws_vars/mysql/global/2/1/ansible_vars",
            "/aws_vars/mysql/prod/ansible_vars",
            "/aws_vars/mysql/prod/2/ansible_vars",
            "/aws_vars/mysql/prod/2/1/ansible_vars",
        ]
    );
}

#[tokio::test]
async fn numeric_host_var_tag_on_localhost_skips_metadata() {
    let metadata = MockMetadataProvider::new()
        .with_tag("Role", "web")
        .with_tag("Environment", "prod")
        .with_tag("Cluster", "from-metadata");
    let resolver = resolver_for(&MockParameterStore::new())
        .with_metadata_provider(Arc::new(metadata.clone()));

    let tags = resolver
        .resolve_tags(&host(
            "localhost",
            json!({ "Role": "web", "Environment": "prod", "Cluster": 7 }),
        ))
        .await;

    assert_eq!(tags.get("Cluster").map(String::as_str), Some("7"));
    assert_eq!(metadata.total_calls(), 0);
}
