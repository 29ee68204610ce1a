mod common;

use common::Project;
use predicates::prelude::*;

#[test]
fn find_by_class_and_function_prints_metrics() {
    let project = Project::new();
    project
        .cmd()
        .args(["find", "--class", "CTrain", "--function", "ProcessControl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found CTrain::ProcessControl"))
        .stdout(predicate::str::contains("Train.cpp:10"))
        .stdout(predicate::str::contains("Body lines: 7"))
        .stdout(predicate::str::contains("Stub marker: no"));
}

#[test]
fn find_by_address_emits_json() {
    let project = Project::new();
    let output = project
        .cmd()
        .args(["find", "--address", "0x6F5900", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).expect("find json");
    assert_eq!(body["query"], "0x6F5900");
    assert_eq!(body["has_stub_marker"], true);
    assert!(body["body"].as_str().expect("body").starts_with('{'));
}

#[test]
fn find_fails_when_nothing_matches() {
    let project = Project::new();
    project
        .cmd()
        .args(["find", "--class", "CTrain", "--function", "Missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No source body found for CTrain::Missing"));
}

#[test]
fn find_requires_a_target() {
    let project = Project::new();
    project.cmd().arg("find").assert().failure();
    project.cmd().args(["find", "--class", "CTrain"]).assert().failure();
}
