//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{tempdir, TempDir};

const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <ADMIN-DATA><SDGS><SDG><SD>1.0.0</SD></SDG></SDGS></ADMIN-DATA>
  <AR-PACKAGES>
    <AR-PACKAGE><SHORT-NAME>ID_7</SHORT-NAME></AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>
"#;

const RULES: &str = r#"{ "rules": [
  { "rule_id": "R001", "description": "Schema version",
    "xpath": "/AUTOSAR/ADMIN-DATA/SDGS/SDG/SD", "condition": "EQUALS",
    "expected": "1.0.0", "mandatory": true },
  { "rule_id": "R002", "description": "Package naming",
    "xpath": "//AR-PACKAGE/SHORT-NAME", "condition": "REGEX",
    "expected": "ID_[0-9]+$" }
] }"#;

/// Project with `rules/rules.json` and one document under `arxml/`
fn create_project(rules: &str) -> TempDir {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("rules")).unwrap();
    fs::create_dir_all(dir.path().join("arxml/ecu")).unwrap();
    fs::write(dir.path().join("rules/rules.json"), rules).unwrap();
    fs::write(dir.path().join("arxml/ecu/main.arxml"), DOC).unwrap();
    dir
}

fn arxcheck(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("arxcheck").unwrap();
    cmd.current_dir(dir.path()).env("HOME", dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_all_pass_exits_zero() {
    let dir = create_project(RULES);

    arxcheck(&dir)
        .args(["arxml", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ecu/main.arxml"))
        .stdout(predicate::str::contains("2 passed"));
}

#[test]
fn test_failure_exits_one() {
    let dir = create_project(&RULES.replace("\"1.0.0\"", "\"2.0.0\""));

    arxcheck(&dir)
        .args(["arxml", "--no-color"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stdout(predicate::str::contains("actual \"1.0.0\", expected \"2.0.0\""));
}

#[test]
fn test_exit_zero_flag() {
    let dir = create_project(&RULES.replace("\"1.0.0\"", "\"2.0.0\""));

    arxcheck(&dir)
        .args(["arxml", "--exit-zero"])
        .assert()
        .success();
}

#[test]
fn test_parse_error_exits_two() {
    let dir = create_project(RULES);
    fs::write(dir.path().join("arxml/broken.arxml"), "<AUTOSAR>").unwrap();

    arxcheck(&dir)
        .args(["arxml", "--format", "csv"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("PARSE_ERROR"));
}

#[test]
fn test_csv_output() {
    let dir = create_project(RULES);

    arxcheck(&dir)
        .args(["arxml", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ARXML Path,ARXML File,Rule ID,Description,XPath,Expected,Actual,Status",
        ))
        .stdout(predicate::str::contains("ecu/main.arxml,main.arxml,R001,Schema version"));
}

#[test]
fn test_json_output_to_file() {
    let dir = create_project(RULES);

    arxcheck(&dir)
        .args(["arxml", "--format", "json", "--output", "report.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Report written to"));

    let content = fs::read_to_string(dir.path().join("report.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["summary"]["counts"]["pass"], 2);
    assert_eq!(value["rows"][1]["actual"], "ID_7");
}

#[test]
fn test_disable_rule() {
    let dir = create_project(&RULES.replace("\"1.0.0\"", "\"2.0.0\""));

    arxcheck(&dir)
        .args(["arxml", "--disable", "R001", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R001").not());
}

#[test]
fn test_missing_rules_is_fatal() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("arxcheck")
        .unwrap()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .args([".", "--rules", "nope.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Failed to load rules"));
}

#[test]
fn test_empty_rules_is_fatal() {
    let dir = create_project(r#"{ "rules": [] }"#);

    arxcheck(&dir)
        .arg("arxml")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No rules loaded"));
}

#[test]
fn test_config_file() {
    let dir = create_project(RULES);
    fs::write(
        dir.path().join(".arxcheck.yaml"),
        "scan:\n  root: arxml\noutput:\n  format: csv\nengine:\n  parallel: false\n",
    )
    .unwrap();

    arxcheck(&dir)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ARXML Path"));
}

#[test]
fn test_rules_subcommand() {
    let dir = create_project(RULES);

    arxcheck(&dir)
        .args(["--no-color", "rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("R001"))
        .stdout(predicate::str::contains("*[local-name()='SHORT-NAME']"))
        .stdout(predicate::str::contains("2 rules"));
}

#[test]
fn test_normalize_subcommand() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("arxcheck")
        .unwrap()
        .current_dir(dir.path())
        .args(["normalize", "/AUTOSAR/ar:AR-PACKAGES"])
        .assert()
        .success()
        .stdout("/*[local-name()='AUTOSAR']/*[local-name()='AR-PACKAGES']\n");
}
