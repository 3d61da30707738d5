//! Integration tests for patch configs: loading, patch-set expansion and
//! dispatch against the observed, desired and environment documents.

use patch_and_transform::config::{
    apply_patches, load_from_json_str, load_from_path, load_from_str, ConfigError, ExpandError,
    PatchError, PatchResult, PatchType,
};
use patch_and_transform::transform::TransformError;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

const ENVIRONMENT_PATCHES: &str = r#"
[meta]
name = "environment-patches"
description = "Share region and naming through the environment"

[[patch_sets]]
name = "naming"

[[patch_sets.patches]]
type = "FromCompositeFieldPath"
from_field_path = "metadata.name"
to_field_path = "data.name"
transforms = [{ type = "string", op = "convert", convert = "to-upper" }]

[[patch_sets.patches]]
type = "CombineFromComposite"
to_field_path = "data.id"

[patch_sets.patches.combine]
variables = [
    { from_field_path = "metadata.name" },
    { from_field_path = "spec.region" },
]
strategy = { type = "string", fmt = "{0}-{1}" }

[[patches]]
type = "PatchSet"
patch_set_name = "naming"

[[patches]]
from_field_path = "spec.region"
to_field_path = "data.region"
transforms = [
    { type = "map", pairs = { "eu-west-1" = "europe", "us-east-1" = "america" } },
]

[[patches]]
type = "ToCompositeFieldPath"
from_field_path = "data.region"
to_field_path = "status.continent"

[[patches]]
type = "CombineToComposite"
to_field_path = "metadata.labels['example.org/id']"

[patches.combine]
variables = [{ from_field_path = "data.id" }]
strategy = { type = "string", fmt = "id={0}" }
"#;

fn observed() -> Value {
    json!({
        "metadata": {"name": "db"},
        "spec": {"region": "eu-west-1", "tags": {"b": 2}}
    })
}

fn outcomes(results: &[(usize, Result<PatchResult, PatchError>)]) -> Vec<&'static str> {
    results
        .iter()
        .map(|(_, result)| match result {
            Ok(PatchResult::Applied { .. }) => "applied",
            Ok(PatchResult::Skipped { .. }) => "skipped",
            Err(_) => "failed",
        })
        .collect()
}

#[test]
fn test_load_and_apply_toml_config() {
    let config = load_from_str(ENVIRONMENT_PATCHES).unwrap();
    assert_eq!(config.meta.name, "environment-patches");
    assert_eq!(config.patch_sets.len(), 1);
    assert_eq!(config.patches[0].effective_type(), PatchType::PatchSet);
    assert_eq!(
        config.patches[1].effective_type(),
        PatchType::FromCompositeFieldPath
    );

    let observed = observed();
    let mut desired = json!({});
    let mut environment = json!({});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|(_, r)| r.is_ok()), "{results:?}");
    assert_eq!(
        environment,
        json!({"data": {"name": "DB", "id": "db-eu-west-1", "region": "europe"}})
    );
    // Later patches see what earlier ones wrote to the environment.
    assert_eq!(
        desired,
        json!({
            "metadata": {"labels": {"example.org/id": "id=db-eu-west-1"}},
            "status": {"continent": "europe"}
        })
    );
}

#[test]
fn test_json_config_matches_toml() {
    let config = load_from_json_str(
        r#"{
            "patches": [
                {"type": "FromCompositeFieldPath", "from_field_path": "spec.region", "to_field_path": "data.region"},
                {"type": "ToCompositeFieldPath", "from_field_path": "data.region", "to_field_path": "spec.region"}
            ]
        }"#,
    )
    .unwrap();

    let observed = observed();
    let mut desired = json!({});
    let mut environment = json!({});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();
    assert_eq!(outcomes(&results), ["applied", "applied"]);
    assert_eq!(desired, json!({"spec": {"region": "eu-west-1"}}));
}

#[test]
fn test_load_from_path_by_extension() {
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("patches.toml");
    let json_path = dir.path().join("patches.json");
    fs::write(&toml_path, ENVIRONMENT_PATCHES).unwrap();
    fs::write(
        &json_path,
        r#"{"patches": [{"from_field_path": "spec.region"}]}"#,
    )
    .unwrap();

    assert_eq!(load_from_path(&toml_path).unwrap().patches.len(), 4);
    assert_eq!(load_from_path(&json_path).unwrap().patches.len(), 1);

    // JSON text in a .toml file is parsed as TOML and fails.
    let wrong = dir.path().join("wrong.toml");
    fs::write(&wrong, r#"{"patches": []}"#).unwrap();
    let err = load_from_path(&wrong).unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
    assert!(err.to_string().contains("wrong.toml"));
}

#[test]
fn test_validation_errors_are_collected() {
    let err = load_from_str(
        r#"
[[patches]]
type = "CombineFromComposite"

[[patches]]
type = "ToCompositeFieldPath"
"#,
    )
    .unwrap_err();

    match err {
        ConfigError::Validation { source, .. } => assert_eq!(source.issues.len(), 2),
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn test_optional_missing_source_leaves_environment_untouched() {
    let config = load_from_str(
        r#"
[[patches]]
type = "FromCompositeFieldPath"
from_field_path = "spec.region"
to_field_path = "data.region"
"#,
    )
    .unwrap();

    let observed = json!({"spec": {}});
    let mut desired = json!({});
    let mut environment = json!({"data": {"zone": "a"}});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    assert_eq!(outcomes(&results), ["skipped"]);
    assert_eq!(environment, json!({"data": {"zone": "a"}}));
}

#[test]
fn test_required_missing_source_fails_only_that_patch() {
    let config = load_from_str(
        r#"
[[patches]]
from_field_path = "spec.zone"
policy = { from_field_path = "Required" }

[[patches]]
from_field_path = "spec.region"
"#,
    )
    .unwrap();

    let observed = observed();
    let mut desired = json!({});
    let mut environment = json!({});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    assert_eq!(outcomes(&results), ["failed", "applied"]);
    assert!(matches!(
        &results[0].1,
        Err(PatchError::SourceFieldNotFound { path }) if path == "spec.zone"
    ));
    assert_eq!(environment, json!({"spec": {"region": "eu-west-1"}}));
}

#[test]
fn test_combine_with_optional_missing_variable() {
    let config = load_from_str(
        r#"
[[patches]]
type = "CombineFromComposite"
to_field_path = "data.pair"

[patches.combine]
variables = [{ from_field_path = "spec.a" }, { from_field_path = "spec.b" }]
strategy = { type = "string", fmt = "{0}-{1}" }
"#,
    )
    .unwrap();

    let observed = json!({"spec": {"a": "a"}});
    let mut desired = json!({});
    let mut environment = json!({});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    assert_eq!(outcomes(&results), ["applied"]);
    assert_eq!(environment, json!({"data": {"pair": "a-"}}));
}

#[test]
fn test_nested_patch_set_aborts_before_dispatch() {
    let config = load_from_str(
        r#"
[[patch_sets]]
name = "outer"

[[patch_sets.patches]]
type = "PatchSet"
patch_set_name = "inner"

[[patch_sets.patches]]
from_field_path = "spec.region"

[[patch_sets]]
name = "inner"

[[patch_sets.patches]]
from_field_path = "spec.region"

[[patches]]
from_field_path = "metadata.name"

[[patches]]
type = "PatchSet"
patch_set_name = "outer"
"#,
    )
    .unwrap();

    let observed = observed();
    let mut desired = json!({});
    let mut environment = json!({});
    let err = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap_err();

    assert!(matches!(err, ExpandError::NestedPatchSet { ref name, position: 0 } if name == "outer"));
    // Not even the first, independent patch ran.
    assert_eq!(environment, json!({}));
}

#[test]
fn test_transform_order_is_significant() {
    let config = load_from_str(
        r#"
[[patches]]
from_field_path = "spec.name"
to_field_path = "data.upper_then_trim"
transforms = [
    { type = "string", op = "convert", convert = "to-upper" },
    { type = "string", op = "trim-prefix", trim = "x" },
]

[[patches]]
from_field_path = "spec.name"
to_field_path = "data.trim_then_upper"
transforms = [
    { type = "string", op = "trim-prefix", trim = "x" },
    { type = "string", op = "convert", convert = "to-upper" },
]
"#,
    )
    .unwrap();

    let observed = json!({"spec": {"name": "xhello"}});
    let mut desired = json!({});
    let mut environment = json!({});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    match &results[0].1 {
        Err(PatchError::Transform(failed)) => {
            assert_eq!(failed.index, 1);
            assert!(matches!(failed.source, TransformError::AffixNotFound { .. }));
        }
        other => panic!("expected transform failure, got {other:?}"),
    }
    assert_eq!(environment, json!({"data": {"trim_then_upper": "HELLO"}}));
}

#[test]
fn test_merge_and_replace_policies() {
    let patches = |policy: &str| {
        load_from_str(&format!(
            r#"
[[patches]]
from_field_path = "spec.tags"
to_field_path = "status.tags"
policy = {{ to_field_path = "{policy}" }}
"#
        ))
        .unwrap()
    };

    let observed = observed();
    for (policy, expected) in [
        ("MergeObjects", json!({"a": 1, "b": 2})),
        ("ForceMergeObjects", json!({"a": 1, "b": 2})),
        ("Replace", json!({"b": 2})),
    ] {
        let mut desired = json!({});
        let mut environment = json!({"status": {"tags": {"a": 1}}});
        let results =
            apply_patches(&patches(policy), &observed, &mut desired, &mut environment).unwrap();
        assert_eq!(outcomes(&results), ["applied"], "{policy}");
        assert_eq!(environment["status"]["tags"], expected, "{policy}");
    }
}

#[test]
fn test_environment_combines_are_skipped() {
    let config = load_from_str(
        r#"
[[patches]]
type = "CombineFromEnvironment"
to_field_path = "spec.id"

[patches.combine]
variables = [{ from_field_path = "data.id" }]
strategy = { type = "string", fmt = "{0}" }
"#,
    )
    .unwrap();

    let observed = observed();
    let mut desired = json!({});
    let mut environment = json!({"data": {"id": "x"}});
    let results = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();

    assert_eq!(outcomes(&results), ["skipped"]);
    assert_eq!(desired, json!({}));
}

#[test]
fn test_apply_is_deterministic() {
    let config = load_from_str(ENVIRONMENT_PATCHES).unwrap();
    let observed = observed();

    let run = || {
        let mut desired = json!({"spec": {"keep": true}});
        let mut environment = json!({});
        let _ = apply_patches(&config, &observed, &mut desired, &mut environment).unwrap();
        (
            serde_json::to_vec(&desired).unwrap(),
            serde_json::to_vec(&environment).unwrap(),
        )
    };

    assert_eq!(run(), run());
}
