//! Tests for template parsing and data-values merge

use pretty_assertions::assert_eq;
use render_fs::Source;
use render_values::path::parse_path;
use render_values::{
    Error, MergePolicy, Node, get_at_path, merge, merge_data_values, parse_documents,
    parse_source,
};
use rstest::rstest;

const DEFAULTS: &str = r#"#@data/values
---
infraProvider: vsphere
antrea:
  config:
    serviceCIDR: 10.96.0.0/12
    serviceCIDRv6: null
    trafficEncapMode: encap
    noSNAT: false
    tlsCipherSuites:
    - TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    - TLS_RSA_WITH_AES_256_GCM_SHA384
    featureGates:
      AntreaProxy: true
      Egress: false
"#;

fn defaults() -> Node {
    parse_documents("values.yaml", DEFAULTS)
        .unwrap()
        .documents
        .remove(0)
        .root
}

fn value_at<'a>(node: &'a Node, path: &str) -> Option<&'a Node> {
    get_at_path(node, &parse_path(path))
}

#[test]
fn test_parse_source_uses_origin() {
    let source = Source::inline("upstream/antrea.yaml", "kind: ConfigMap\nmetadata:\n  name: x\n");
    let set = parse_source(&source).unwrap();
    assert_eq!(set.origin, "upstream/antrea.yaml");
    let meta = &set.documents[0].root.as_mapping().unwrap().entry("metadata").unwrap().meta;
    assert_eq!(meta.describe_position(), "upstream/antrea.yaml:2");
}

#[test]
fn test_merge_override_updates_single_field() {
    let overrides = parse_documents(
        "stdin.yml",
        "#@data/values\n---\nantrea:\n  config:\n    noSNAT: true\n",
    )
    .unwrap();

    let merged = merge_data_values(
        [&parse_documents("values.yaml", DEFAULTS).unwrap().documents[0]]
            .into_iter()
            .chain(overrides.documents.iter()),
        MergePolicy::StrictMatch,
    )
    .unwrap();

    assert_eq!(value_at(&merged, "antrea.config.noSNAT"), Some(&Node::bool(true)));
    assert_eq!(
        value_at(&merged, "antrea.config.trafficEncapMode").and_then(Node::as_str),
        Some("encap")
    );
    assert_eq!(
        value_at(&merged, "antrea.config.featureGates.AntreaProxy"),
        Some(&Node::bool(true))
    );
}

#[rstest]
#[case::strict(MergePolicy::StrictMatch, false)]
#[case::child_defaults_strict(MergePolicy::MatchChildDefaults { missing_ok: false }, false)]
#[case::child_defaults_missing_ok(MergePolicy::MatchChildDefaults { missing_ok: true }, true)]
fn test_new_key_depends_on_policy(#[case] policy: MergePolicy, #[case] accepted: bool) {
    let overrides = parse_documents("stdin.yml", "antrea:\n  config:\n    wireGuard: true\n")
        .unwrap()
        .documents
        .remove(0)
        .root;

    let result = merge(defaults(), &overrides, policy);
    assert_eq!(result.is_ok(), accepted);
}

#[test]
fn test_document_annotation_scopes_policy() {
    let overrides = parse_documents(
        "stdin.yml",
        "#@data/values\n#@overlay/match-child-defaults missing_ok=True\n---\nantrea:\n  config:\n    serviceCIDRv6: \"[fe80::1]/64\"\n    extra: 1\n",
    )
    .unwrap();
    let base = parse_documents("values.yaml", DEFAULTS).unwrap();

    let merged = merge_data_values(
        base.documents.iter().chain(overrides.documents.iter()),
        MergePolicy::StrictMatch,
    )
    .unwrap();

    assert_eq!(
        value_at(&merged, "antrea.config.serviceCIDRv6").and_then(Node::as_str),
        Some("[fe80::1]/64")
    );
    assert!(value_at(&merged, "antrea.config.extra").is_some());
}

#[test]
fn test_unknown_root_field_names_key_and_line() {
    let overrides = parse_documents(
        "stdin.yml",
        "#@data/values\n---\nantrea:\n  config:\ninvalid: \"option\"\n",
    )
    .unwrap();
    let base = parse_documents("values.yaml", DEFAULTS).unwrap();

    let err = merge_data_values(
        base.documents.iter().chain(overrides.documents.iter()),
        MergePolicy::StrictMatch,
    )
    .unwrap_err();

    assert!(matches!(err, Error::UnknownField { .. }));
    let message = err.to_string();
    assert!(message.contains("Map item (key 'invalid') on line stdin.yml:5"));
    assert!(message.contains("Expected number of matched nodes to be 1, but was 0"));
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let overrides = parse_documents("stdin.yml", "antrea:\n  config:\n    featureGates: [a]\n")
        .unwrap()
        .documents
        .remove(0)
        .root;

    let err = merge(defaults(), &overrides, MergePolicy::StrictMatch).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Map item (key 'featureGates') on line stdin.yml:3: cannot replace map with array"
    );
}

#[test]
fn test_merge_is_deterministic() {
    let overrides = parse_documents("stdin.yml", "antrea:\n  config:\n    noSNAT: true\n")
        .unwrap()
        .documents
        .remove(0)
        .root;

    let first = merge(defaults(), &overrides, MergePolicy::StrictMatch).unwrap();
    let second = merge(defaults(), &overrides, MergePolicy::StrictMatch).unwrap();
    assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
}

#[test]
fn test_serialized_defaults_keep_source_order() {
    let node = value_at(&defaults(), "antrea.config").unwrap().clone();
    insta::assert_snapshot!(node.to_yaml().unwrap(), @r###"
    serviceCIDR: 10.96.0.0/12
    serviceCIDRv6: null
    trafficEncapMode: encap
    noSNAT: false
    tlsCipherSuites:
    - TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
    - TLS_RSA_WITH_AES_256_GCM_SHA384
    featureGates:
      AntreaProxy: true
      Egress: false
    "###);
}

#[test]
fn test_non_mapping_data_values_rejected() {
    let docs = parse_documents("bad.yaml", "---\na: 1\n---\n- x\n").unwrap();
    let err = merge_data_values(docs.documents.iter(), MergePolicy::StrictMatch).unwrap_err();
    assert!(matches!(err, Error::NotAMapping { .. }));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_scalar_override_leaves_siblings_untouched(no_snat in any::<bool>(), mode in "[a-z]{2,8}Encap") {
            let text = format!("antrea:\n  config:\n    noSNAT: {no_snat}\n    trafficEncapMode: {mode}\n");
            let overrides = parse_documents("stdin.yml", &text).unwrap().documents.remove(0).root;
            let defaults = defaults();
            let merged = merge(defaults.clone(), &overrides, MergePolicy::StrictMatch).unwrap();

            prop_assert_eq!(value_at(&merged, "antrea.config.noSNAT").and_then(Node::as_bool), Some(no_snat));
            prop_assert_eq!(value_at(&merged, "antrea.config.trafficEncapMode").and_then(Node::as_str), Some(mode.as_str()));
            prop_assert_eq!(value_at(&merged, "antrea.config.featureGates"), value_at(&defaults, "antrea.config.featureGates"));
            prop_assert_eq!(value_at(&merged, "infraProvider"), value_at(&defaults, "infraProvider"));
        }
    }
}
