//! Integration tests for the `mimic` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-q", "-p", "mimic-cli", "--bin", "mimic", "--"]);
    cmd
}

fn mimic(cwd: &Path, args: &[&str]) -> Output {
    cargo_bin()
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .output()
        .expect("failed to execute mimic")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_project(dir: &Path) {
    fs::write(
        dir.join("mimic.json"),
        r#"{
            "webpackConfig": {
                "resolve": {
                    "alias": { "greet": "./lib/greeting" },
                    "extensions": [".txt"]
                },
                "module": {
                    "loaders": [
                        { "test": "\\.txt$", "loader": "banner?banner=//txt!raw" },
                        { "test": "\\.cfg$", "loader": "json" }
                    ]
                }
            }
        }"#,
    )
    .unwrap();
    fs::create_dir_all(dir.join("lib")).unwrap();
    fs::write(dir.join("lib/greeting.txt"), "hi").unwrap();
    fs::write(dir.join("plain.js"), "module.exports = 1;\n").unwrap();
    fs::write(dir.join("bad.cfg"), "{ nope").unwrap();
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = mimic(dir.path(), &["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("mimic "));
}

#[test]
fn test_check_json_reports_rules() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = mimic(dir.path(), &["--json", "check"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["ok"], true);
    assert_eq!(report["aliases"], 1);
    assert_eq!(report["extensions"][0], ".txt");
    assert_eq!(report["rules"][0]["loaders"][0], "banner-loader");
    assert_eq!(report["rules"][0]["loaders"][1], "raw-loader");
    assert_eq!(report["rules"][1]["loaders"][0], "json-loader");
}

#[test]
fn test_check_fails_on_unknown_loader() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("mimic.json"),
        r#"{"webpackConfig":{"module":{"loaders":[{"test":"x","loader":"missing"}]}}}"#,
    )
    .unwrap();

    let output = mimic(dir.path(), &["check"]);
    assert!(!output.status.success());
}

#[test]
fn test_transform_runs_matching_chain() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = mimic(dir.path(), &["transform", "lib/greeting.txt"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "//txt\nmodule.exports = \"hi\";\n");

    let output = mimic(dir.path(), &["transform", "plain.js"]);
    assert_eq!(stdout(&output), "module.exports = 1;\n");

    let output = mimic(dir.path(), &["transform", "bad.cfg"]);
    assert!(!output.status.success());
}

#[test]
fn test_resolve_applies_alias_and_extensions() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = mimic(dir.path(), &["--json", "resolve", "greet"]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["aliased"], "./lib/greeting");
    assert!(report["path"].as_str().unwrap().ends_with("greeting.txt"));
}

#[test]
fn test_require_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let output = mimic(dir.path(), &["require", "greet"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "//txt\nmodule.exports = \"hi\";\n");

    let output = mimic(dir.path(), &["require", "./missing"]);
    assert!(!output.status.success());
}

#[test]
fn test_explicit_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("other.json"),
        r#"{"webpackConfig":{"module":{"loaders":[{"test":"\\.js$","loader":"null"}]}}}"#,
    )
    .unwrap();
    fs::write(dir.path().join("a.js"), "gone").unwrap();

    let output = mimic(dir.path(), &["--config", "other.json", "transform", "a.js"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "\n");
}
