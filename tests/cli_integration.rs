//! Integration tests for the command-line interface
//!
//! Tests the apply, check and list commands against temp workspaces

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const RULESET: &str = r#"[meta]
name = "greeting"
description = "Test ruleset"
target = "hello.js"

[[changes]]
id = "greeting"
summary = "greeting now says goodbye"

[[rules]]
id = "hello"
change = "greeting"
replace = "console.log('goodbye')"

[rules.match]
type = "literal"
text = "console.log('hello')"

[[rules]]
id = "absent"
change = "greeting"
replace = "never"

[rules.match]
type = "literal"
text = "this text is not in the file"
"#;

/// Helper to create a test workspace with a rulesets/ directory
fn setup_test_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::write(
        dir.path().join("hello.js"),
        "function greet() {\n  console.log('hello')\n}\n",
    )
    .unwrap();

    let rulesets_dir = dir.path().join("rulesets");
    fs::create_dir(&rulesets_dir).unwrap();
    fs::write(rulesets_dir.join("greeting.toml"), RULESET).unwrap();

    dir
}

fn patcher(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_retrofit-patcher"))
        .args(args)
        .current_dir(dir)
        .env_remove("RETROFIT_PATCHER_DIR")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    let output = patcher(&["apply", "--help"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply rulesets and overwrite their target files"));
}

#[test]
fn test_apply_discovered_rulesets() {
    let workspace = setup_test_workspace();

    let output = patcher(&["apply"], workspace.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("OK - hello.js patched (greeting)"));
    assert!(stdout.contains("   - greeting now says goodbye"));
    assert!(stdout.contains("hello: 1 match"));
    assert!(stdout.contains("absent: no match"));
    assert!(stdout.contains("Summary:"));

    let content = fs::read_to_string(workspace.path().join("hello.js")).unwrap();
    assert!(content.contains("console.log('goodbye')"));
}

#[test]
fn test_apply_dry_run_with_diff() {
    let workspace = setup_test_workspace();

    let output = patcher(&["apply", "--dry-run", "--diff"], workspace.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("DRY RUN - hello.js not written"));
    assert!(stdout.contains("+  console.log('goodbye')"));
    assert!(stdout.contains("-  console.log('hello')"));

    let content = fs::read_to_string(workspace.path().join("hello.js")).unwrap();
    assert!(content.contains("console.log('hello')"));
}

#[test]
fn test_apply_strict_fails_on_noop_rule() {
    let workspace = setup_test_workspace();

    let output = patcher(&["apply", "--strict"], workspace.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent"));

    let content = fs::read_to_string(workspace.path().join("hello.js")).unwrap();
    assert!(content.contains("console.log('hello')"));
}

#[test]
fn test_apply_missing_target_fails() {
    let workspace = setup_test_workspace();
    fs::remove_file(workspace.path().join("hello.js")).unwrap();

    let output = patcher(&["apply"], workspace.path());

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("OK -"));
}

#[test]
fn test_apply_builtin_with_dir() {
    let workspace = TempDir::new().unwrap();
    let input = fs::read_to_string("tests/fixtures/storage.ts.input").unwrap();
    fs::write(workspace.path().join("storage.ts"), &input).unwrap();
    let elsewhere = TempDir::new().unwrap();

    let output = patcher(
        &[
            "apply",
            "--builtin",
            "storage",
            "--dir",
            workspace.path().to_str().unwrap(),
        ],
        elsewhere.path(),
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("userId added to every db.add and db.put"));

    let expected = fs::read_to_string("tests/fixtures/storage.ts.expected").unwrap();
    let content = fs::read_to_string(workspace.path().join("storage.ts")).unwrap();
    assert_eq!(content, expected);
}

#[test]
fn test_apply_json_reports_hashes() {
    let workspace = setup_test_workspace();

    let output = patcher(&["apply", "--json"], workspace.path());

    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let report = &reports[0];
    assert_eq!(report["ruleset"], "greeting");
    assert_eq!(report["written"], true);
    assert_eq!(report["rules"][0]["matches"], 1);
    assert_ne!(report["before_hash"], report["after_hash"]);
    assert!(report.get("before").is_none());
}

#[test]
fn test_relative_target_resolves_against_dir() {
    let workspace = setup_test_workspace();
    fs::rename(
        workspace.path().join("hello.js"),
        workspace.path().join("other.js"),
    )
    .unwrap();
    let elsewhere = TempDir::new().unwrap();

    let output = patcher(
        &[
            "apply",
            "--rules",
            workspace.path().join("rulesets/greeting.toml").to_str().unwrap(),
            "--target",
            "other.js",
            "--dir",
            workspace.path().to_str().unwrap(),
        ],
        elsewhere.path(),
    );

    assert!(output.status.success());
    let content = fs::read_to_string(workspace.path().join("other.js")).unwrap();
    assert!(content.contains("console.log('goodbye')"));
    assert!(!elsewhere.path().join("other.js").exists());
}

#[test]
fn test_check_is_read_only() {
    let workspace = setup_test_workspace();

    let output = patcher(&["check"], workspace.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Ruleset: greeting"));
    assert!(stdout.contains("absent: no match"));
    assert!(stdout.contains("Hints:"));

    let content = fs::read_to_string(workspace.path().join("hello.js")).unwrap();
    assert!(content.contains("console.log('hello')"));
}

#[test]
fn test_check_json() {
    let workspace = setup_test_workspace();

    let output = patcher(&["check", "--json"], workspace.path());

    assert!(output.status.success());
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rules = reports[0]["rules"].as_array().unwrap();
    assert_eq!(rules[0]["rule_id"], "hello");
    assert_eq!(rules[0]["matches"], 1);
    assert_eq!(rules[1]["matches"], 0);
}

#[test]
fn test_list_builtins() {
    let dir = TempDir::new().unwrap();
    let output = patcher(&["list"], dir.path());

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("server.js"));
    assert!(stdout.contains("storage.ts"));
    assert!(stdout.contains("api.ts"));
}

#[test]
fn test_unknown_builtin() {
    let dir = TempDir::new().unwrap();
    let output = patcher(&["apply", "--builtin", "nope"], dir.path());

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("server, storage, api"));
}
