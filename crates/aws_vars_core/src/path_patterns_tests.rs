//! Tests for the path template catalog.

use super::*;
use std::collections::HashSet;

#[test]
fn catalog_has_eight_templates_in_tier_order() {
    assert_eq!(PATH_PATTERNS.len(), 8);

    let tiers: Vec<PathTier> = PATH_PATTERNS.iter().map(|p| p.tier).collect();
    let mut sorted = tiers.clone();
    sorted.sort();
    assert_eq!(tiers, sorted, "templates must be grouped by tier in order");

    assert_eq!(patterns_for(PathTier::Base).count(), 2);
    assert_eq!(patterns_for(PathTier::Global).count(), 2);
    assert_eq!(patterns_for(PathTier::Environment).count(), 4);
}

#[test]
fn every_template_ends_with_vars_suffix() {
    for pattern in PATH_PATTERNS.iter() {
        assert!(
            pattern.template.ends_with(VARS_SUFFIX),
            "{} should end with {}",
            pattern.template,
            VARS_SUFFIX
        );
        assert!(pattern.template.starts_with("{BASE_PATH}/"));
    }
}

#[test]
fn requires_matches_placeholders() {
    for pattern in PATH_PATTERNS.iter() {
        let declared: HashSet<&str> = pattern.requires.iter().map(|f| f.as_str()).collect();
        let used: HashSet<&str> = placeholders(pattern.template)
            .into_iter()
            .filter(|name| *name != BASE_PATH_PLACEHOLDER)
            .collect();
        assert_eq!(declared, used, "mismatch in {}", pattern.template);
    }
}

#[test]
fn templates_are_unique() {
    let unique: HashSet<&str> = PATH_PATTERNS.iter().map(|p| p.template).collect();
    assert_eq!(unique.len(), PATH_PATTERNS.len());
}

#[test]
fn placeholders_are_extracted_in_order() {
    assert_eq!(
        placeholders("{BASE_PATH}/{role}/global/{cluster}/ansible_vars"),
        vec!["BASE_PATH", "role", "cluster"]
    );
    assert!(placeholders("/plain/path").is_empty());
    assert_eq!(placeholders("/a/{open"), Vec::<&str>::new());
}

#[test]
fn tier_names_are_uppercase() {
    let names: Vec<String> = PathTier::ALL.iter().map(|t| t.to_string()).collect();
    assert_eq!(names, vec!["BASE", "GLOBAL", "ENVIRONMENT"]);
}
