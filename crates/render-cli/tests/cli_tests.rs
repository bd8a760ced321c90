//! Integration tests for the mrender binary

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use render_test_utils::fixtures::{ANTREA_TWEAKER, antrea_bundle};
use render_test_utils::values::data_values;

fn mrender() -> Command {
    Command::cargo_bin("mrender").expect("Failed to find mrender binary")
}

fn render_package() -> Command {
    let mut cmd = mrender();
    cmd.arg("render").arg("--package").arg(antrea_bundle());
    cmd
}

// ============================================================================
// render
// ============================================================================

#[test]
fn test_render_package_defaults() {
    render_package()
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\n"))
        .stdout(predicate::str::contains("name: antrea-config-2dd957m7fk"))
        .stdout(predicate::str::contains("trafficEncapMode: encap"))
        .stdout(predicate::str::contains("serviceCIDRv6").not());
}

#[test]
fn test_render_stdin_override() {
    render_package()
        .args(["--data-values-file", "-"])
        .write_stdin(data_values("serviceCIDRv6: \"[fe80::1]/64\""))
        .assert()
        .success()
        .stdout(predicate::str::contains("serviceCIDRv6:"))
        .stdout(predicate::str::contains("fe80::1"));
}

#[test]
fn test_render_unknown_field_fails_with_location() {
    render_package()
        .args(["--data-values-file", "-"])
        .write_stdin("#@data/values\n---\nantrea:\n  config:\n    invalid: 1\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("Map item (key 'invalid') on line stdin.yml:5"));
}

#[test]
fn test_render_data_value_assignment() {
    render_package()
        .args(["--data-value", "antrea.config.noSNAT=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("noSNAT: true"));
}

#[test]
fn test_render_to_output_file() {
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("out/rendered.yaml");

    render_package()
        .arg("-o")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    out.assert(predicate::str::contains("kind: DaemonSet"));
}

#[test]
fn test_output_file_matches_stdout() {
    let temp = assert_fs::TempDir::new().unwrap();
    let out = temp.child("rendered.yaml");

    let stdout = render_package().output().unwrap().stdout;
    render_package().arg("-o").arg(out.path()).assert().success();

    assert_eq!(
        std::fs::read_to_string(out.path()).unwrap(),
        String::from_utf8(stdout).unwrap()
    );
}

#[test]
fn test_render_explicit_files() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("values.yaml")
        .write_str("#@data/values\n---\nname: demo\n")
        .unwrap();
    temp.child("cm.yaml")
        .write_str("kind: ConfigMap\nmetadata:\n  name: #@ values.name\n")
        .unwrap();

    mrender()
        .arg("render")
        .arg("-f")
        .arg(temp.child("values.yaml").path())
        .arg("-f")
        .arg(temp.child("cm.yaml").path())
        .assert()
        .success()
        .stdout("---\nkind: ConfigMap\nmetadata:\n  name: demo\n");
}

#[test]
fn test_render_without_templates_fails() {
    mrender()
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No templates given"));
}

// ============================================================================
// extract
// ============================================================================

#[test]
fn test_extract_tweaker_key_from_render() {
    let rendered = render_package().output().unwrap().stdout;

    mrender()
        .args(["extract", "--kind", "ConfigMap", "--name", ANTREA_TWEAKER])
        .args(["--key", "antrea-agent-tweaker.conf"])
        .write_stdin(rendered)
        .assert()
        .success()
        .stdout("disableUdpTunnelOffload: false\n");
}

#[test]
fn test_extract_missing_document_fails() {
    mrender()
        .args(["extract", "--kind", "Secret", "--name", "nope"])
        .write_stdin("---\nkind: ConfigMap\nmetadata:\n  name: cm\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Secret named 'nope'"));
}
