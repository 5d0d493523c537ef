use assert_cmd::Command;
use predicates::prelude::*;

mod common;

use class_reducer_classfile::ClassFile;
use common::{sample_class, Workspace};

fn reducer() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("class-reducer").unwrap()
}

#[test]
fn test_list_modules() {
    reducer()
        .arg("--list-modules")
        .assert()
        .success()
        .stdout(predicate::str::contains("RemoveWriteOnlyFields"))
        .stdout(predicate::str::contains("RemoveVoidMethodCalls"));
}

#[test]
fn test_list_modules_json() {
    let output = reducer()
        .args(["--list-modules", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let modules = json.as_array().unwrap();
    assert_eq!(modules.len(), 7);
    // Sound and cheap modules come first.
    assert_eq!(modules[0]["soundness"], "sound");
    assert_eq!(modules[6]["id"], "RemoveVoidMethodCalls");
    assert_eq!(modules[6]["cost"], "expensive");
}

#[test]
fn test_missing_tests_fail() {
    let ws = Workspace::new();
    reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no valid interestingness tests"));
}

#[test]
fn test_unknown_module_fails() {
    let ws = Workspace::new();
    ws.script("check.sh", "exit 0\n");
    reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .args(["--module", "NoSuchModule"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no reduction modules selected"));
}

#[cfg(unix)]
#[test]
fn test_reduces_sample_class() {
    let ws = Workspace::new();
    ws.script("check.sh", "test -f demo/Sample.class\n");
    let report_path = ws.path().join("report.json");

    reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .arg("--report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("demo/Sample"));

    let reduced = std::fs::read(ws.output()).unwrap();
    assert!(reduced.len() < sample_class().len());
    let class = ClassFile::parse(&reduced).unwrap();
    assert!(class.fields.is_empty());
    assert!(class.attributes.is_empty());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["artifacts"][0]["name"], "demo/Sample");
    assert_eq!(report["seed_verified"], true);
    assert!(!ws.path().join(".tmp").exists());
}

#[cfg(unix)]
#[test]
fn test_module_filter_limits_reduction() {
    let ws = Workspace::new();
    ws.script("check.sh", "exit 0\n");

    let output = reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .args(["--module", "removewriteonlyfields", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["modules"], serde_json::json!(["RemoveWriteOnlyFields"]));
    assert_eq!(report["artifacts"][0]["stats"]["tests_run"], 1);

    let class = ClassFile::parse(&std::fs::read(ws.output()).unwrap()).unwrap();
    assert!(class.fields.is_empty());
    // Debug attributes are untouched without StripDebugAttributes.
    assert_eq!(class.attributes.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_uninteresting_input_fails() {
    let ws = Workspace::new();
    ws.script("check.sh", "exit 1\n");
    reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not interesting"));
}

#[cfg(unix)]
#[test]
fn test_failing_suite_without_seed_check_keeps_input() {
    let ws = Workspace::new();
    ws.script("check.sh", "exit 1\n");
    reducer()
        .arg("--working-dir")
        .arg(ws.path())
        .arg("--no-seed-check")
        .assert()
        .success();
    assert_eq!(std::fs::read(ws.output()).unwrap(), sample_class());
}
