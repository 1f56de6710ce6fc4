// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RULES: &str = r#"{
    "always": ["or", ["not", ["false"]], "x"],
    "is_get": ["and", ["field", "request_method"], ["not", ["false"]]],
    "has_cookie": ["field", "cookie"]
}"#;

const TX: &str = r#"{
    "id": 3,
    "request": { "method": "GET", "uri": "/", "protocol": "HTTP/1.1" }
}"#;

fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("write fixture");
    path
}

fn predicate() -> Command {
    Command::cargo_bin("predicate").expect("binary built")
}

#[test]
fn render_prints_unoptimized_rules() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(&dir, "rules.json", RULES);
    predicate()
        .arg("render")
        .arg("--rules")
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "always: (or (not (false)) 'x')",
        ))
        .stdout(predicate::str::contains("has_cookie: (field 'cookie')"));
}

#[test]
fn render_optimize_folds_constants() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(&dir, "rules.json", RULES);
    predicate()
        .args(["render", "--optimize", "--rules"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("always: ''"))
        .stdout(predicate::str::contains(
            "is_get: (and '' (field 'request_method'))",
        ));
}

#[test]
fn eval_prints_truth_per_rule() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(&dir, "rules.json", RULES);
    let tx = write(&dir, "tx.json", TX);
    predicate()
        .arg("eval")
        .arg("--rules")
        .arg(&rules)
        .arg("--tx")
        .arg(&tx)
        .assert()
        .success()
        .stdout(predicate::str::contains("always: true"))
        .stdout(predicate::str::contains("is_get: true"))
        .stdout(predicate::str::contains("has_cookie: false"));
}

#[test]
fn failed_rules_are_listed_and_fail_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(
        &dir,
        "rules.json",
        r#"{ "ok": "yes", "broken": ["frobnicate"] }"#,
    );
    predicate()
        .arg("render")
        .arg("--rules")
        .arg(&rules)
        .assert()
        .failure()
        .stdout(predicate::str::contains("ok: 'yes'"))
        .stdout(predicate::str::contains("broken: error:"));
}

#[test]
fn disabled_optimizer_config_leaves_rules_untouched() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(&dir, "rules.json", r#"{ "neg": ["not", ["false"]] }"#);
    let config = write(&dir, "config.json", r#"{ "optimizer": { "enabled": false } }"#);
    predicate()
        .arg("--config")
        .arg(&config)
        .args(["render", "--optimize", "--rules"])
        .arg(&rules)
        .assert()
        .success()
        .stdout(predicate::str::contains("neg: (not (false))"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let rules = write(&dir, "rules.json", RULES);
    let config = write(&dir, "config.json", r#"{ "optimiser": {} }"#);
    predicate()
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg("--rules")
        .arg(&rules)
        .assert()
        .failure()
        .stderr(predicate::str::contains("load config"));
}

#[test]
fn missing_rule_file_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    predicate()
        .arg("render")
        .arg("--rules")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("read rules"));
}
