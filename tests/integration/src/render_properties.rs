//! Whole-package render properties: determinism, override locality and
//! shape-by-presence.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use render_core::{Pipeline, render_sources};
use render_fs::SourceSet;
use render_test_utils::fixtures::{ANTREA_CONFIG, antrea_bundle};
use render_test_utils::values::override_source;
use rstest::rstest;
use serde_yaml::{Mapping, Value};

fn agent_conf(field: Option<&str>) -> Mapping {
    let mut pipeline = Pipeline::from_package(&antrea_bundle()).unwrap();
    if let Some(field) = field {
        pipeline = pipeline.with_override(override_source(field));
    }
    let output = pipeline.render().unwrap();
    let text = output
        .find("ConfigMap", ANTREA_CONFIG)
        .and_then(|cm| cm.payload_value("antrea-agent.conf"))
        .unwrap()
        .to_string();
    serde_yaml::from_str(&text).unwrap()
}

/// Keys whose values differ between two renders of the agent configuration.
fn changed_keys(before: &Mapping, after: &Mapping) -> Vec<String> {
    let mut keys: Vec<String> = before
        .keys()
        .chain(after.keys())
        .filter(|k| before.get(k) != after.get(k))
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[test]
fn test_repeated_renders_are_byte_identical() {
    let templates = || {
        let bundle = antrea_bundle();
        render_core::PackageManifest::load(&bundle)
            .unwrap()
            .sources(&bundle)
            .unwrap()
    };
    let first = render_sources(templates(), SourceSet::new()).unwrap();
    for _ in 0..3 {
        assert_eq!(render_sources(templates(), SourceSet::new()).unwrap(), first);
    }
}

#[rstest]
#[case::no_snat("noSNAT: true", "noSNAT")]
#[case::encap_mode("trafficEncapMode: noEncap", "trafficEncapMode")]
#[case::service_cidr("serviceCIDR: 10.100.0.0/16", "serviceCIDR")]
#[case::ipv6("serviceCIDRv6: fd00::/108", "serviceCIDRv6")]
#[case::cipher_suites("tlsCipherSuites: [TLS_AES_128_GCM_SHA256]", "tlsCipherSuites")]
fn test_override_changes_exactly_one_key(#[case] field: &str, #[case] key: &str) {
    let defaults = agent_conf(None);
    let changed = agent_conf(Some(field));
    assert_eq!(changed_keys(&defaults, &changed), vec![key.to_string()]);
}

#[test]
fn test_optional_key_present_only_when_set() {
    let defaults = agent_conf(None);
    assert!(!defaults.contains_key("serviceCIDRv6"));

    let set = agent_conf(Some("serviceCIDRv6: fd00::/108"));
    assert_eq!(set.get("serviceCIDRv6"), Some(&Value::from("fd00::/108")));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_gate_override_touches_only_feature_gates(enabled in any::<bool>(), gate in prop::sample::select(vec![
        "AntreaIPAM", "Egress", "FlowExporter", "Multicast", "Traceflow",
    ])) {
        let defaults = agent_conf(None);
        let field = format!("featureGates:\n  {gate}: {enabled}");
        let changed = agent_conf(Some(&field));

        let gates = changed.get("featureGates").and_then(Value::as_mapping).unwrap();
        prop_assert_eq!(gates.len(), 12);
        prop_assert_eq!(gates.get(gate), Some(&Value::Bool(enabled)));

        let keys = changed_keys(&defaults, &changed);
        prop_assert!(keys.is_empty() || keys == vec!["featureGates".to_string()]);
    }
}
