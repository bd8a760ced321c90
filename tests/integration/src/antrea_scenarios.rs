//! Antrea package scenarios
//!
//! Renders the Antrea 1.5.2 bundle the way a package consumer would: caller
//! data values on stdin, output decoded back into ConfigMaps.

use pretty_assertions::assert_eq;
use render_core::Pipeline;
use render_extract::{Resource, decode, find_by_name, find_docs_with};
use render_test_utils::fixtures::{ANTREA_CONFIG, ANTREA_TWEAKER, antrea_bundle};
use render_test_utils::values::{data_values, stdin_overrides};

const TLS_CIPHER_SUITES: &str = "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,TLS_RSA_WITH_AES_256_GCM_SHA384";

const FEATURE_GATES: &str = "\
featureGates:
  AntreaIPAM: false
  AntreaPolicy: true
  AntreaProxy: true
  Egress: false
  EndpointSlice: false
  FlowExporter: false
  Multicast: false
  NetworkPolicyStats: false
  NodePortLocal: true
  SecondaryNetwork: false
  ServiceExternalIP: false
  Traceflow: true
";

/// Render the bundle with `values` piped as caller data values.
fn render(values: &str) -> render_core::Result<String> {
    let mut pipeline = Pipeline::from_package(&antrea_bundle())?;
    if !values.is_empty() {
        pipeline = pipeline.with_overrides(stdin_overrides(values));
    }
    pipeline.render()?.to_text()
}

fn config_maps(output: &str) -> Vec<Resource> {
    find_docs_with(output, "kind: ConfigMap")
        .iter()
        .enumerate()
        .map(|(i, doc)| decode(i, doc).unwrap())
        .collect()
}

fn config_value(output: &str, name: &str, key: &str) -> String {
    let maps = config_maps(output);
    find_by_name(&maps, "ConfigMap", name)
        .unwrap()
        .data_value(key)
        .unwrap_or_else(|| panic!("{name} has no {key}"))
        .to_string()
}

/// Compare as YAML values, ignoring layout and key order.
fn assert_yaml_eq(actual: &str, expected: &str) {
    let actual: serde_yaml::Value = serde_yaml::from_str(actual).unwrap();
    let expected: serde_yaml::Value = serde_yaml::from_str(expected).unwrap();
    assert_eq!(actual, expected);
}

fn agent_conf(extra: &str) -> String {
    format!(
        "antreaProxy: null\negress: null\n{FEATURE_GATES}noSNAT: false\nnodePortLocal: null\nserviceCIDR: 10.96.0.0/12\n{extra}tlsCipherSuites: {TLS_CIPHER_SUITES}\ntrafficEncapMode: encap\nwireGuard: null\n"
    )
}

#[test]
fn test_default_agent_configuration() {
    let output = render("").unwrap();
    let conf = config_value(&output, ANTREA_CONFIG, "antrea-agent.conf");
    assert_yaml_eq(&conf, &agent_conf(""));
    assert!(!conf.contains("serviceCIDRv6"));
}

#[test]
fn test_service_cidr_v6_adds_only_that_key() {
    let output = render(&data_values("serviceCIDRv6: \"[fe80::1]/64\"")).unwrap();
    let conf = config_value(&output, ANTREA_CONFIG, "antrea-agent.conf");
    assert_yaml_eq(&conf, &agent_conf("serviceCIDRv6: \"[fe80::1]/64\"\n"));
}

#[test]
fn test_tweaker_default() {
    let output = render("").unwrap();
    assert_yaml_eq(
        &config_value(&output, ANTREA_TWEAKER, "antrea-agent-tweaker.conf"),
        "disableUdpTunnelOffload: false\n",
    );
}

#[test]
fn test_tweaker_enabled() {
    let output = render(&data_values("disableUdpTunnelOffload: true")).unwrap();
    assert_yaml_eq(
        &config_value(&output, ANTREA_TWEAKER, "antrea-agent-tweaker.conf"),
        "disableUdpTunnelOffload: true\n",
    );
}

#[test]
fn test_wrong_field_fails() {
    let values = "#@data/values\n---\nantrea:\n  config:\ninvalid: \"option\"\n";
    let message = render(values).unwrap_err().to_string();
    assert!(message.contains("Map item (key 'invalid') on line stdin.yml"), "{message}");
    assert!(
        message.contains("Expected number of matched nodes to be 1, but was 0"),
        "{message}"
    );
}

#[test]
fn test_enable_option_renders_value() {
    let field = "noSNAT: true";
    let output = render(&data_values(field)).unwrap();
    assert!(config_value(&output, ANTREA_CONFIG, "antrea-agent.conf").contains(field));
}

#[test]
fn test_feature_gate_override_is_shared_by_both_tables() {
    let output = render(&data_values("featureGates:\n  Egress: true")).unwrap();
    let agent: serde_yaml::Value =
        serde_yaml::from_str(&config_value(&output, ANTREA_CONFIG, "antrea-agent.conf")).unwrap();
    let controller: serde_yaml::Value =
        serde_yaml::from_str(&config_value(&output, ANTREA_CONFIG, "antrea-controller.conf")).unwrap();

    assert_eq!(agent["featureGates"]["Egress"], serde_yaml::Value::Bool(true));
    assert_eq!(controller["featureGates"]["Egress"], serde_yaml::Value::Bool(true));
    assert_eq!(controller["featureGates"].as_mapping().map(|m| m.len()), Some(7));
}

#[test]
fn test_cni_conflist_is_untouched() {
    let output = render("").unwrap();
    let conflist = config_value(&output, ANTREA_CONFIG, "antrea-cni.conflist");
    assert!(conflist.starts_with("{\n    \"cniVersion\":\"0.3.0\",\n"));
}
