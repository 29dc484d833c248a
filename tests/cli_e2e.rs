//! CLI end-to-end tests.
//!
//! These tests spawn the actual `retalk` binary against a scratch workspace
//! and validate stdout, exit codes and the files left on disk.
//!
//! Exit code expectations:
//! - 0: Success
//! - 2: Invalid arguments (bad location, prompts without answers off a TTY)
//! - 3: Resolution error (no such refactoring at the location)
//! - 5: Precondition failed

use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

const SOURCE: &str = "\
:- object(a).

\t:- public(foo/1).

\tfoo(X) :- bar(X).

:- end_object.
";

/// Scratch workspace holding `a.lgt`.
fn workspace() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    fs::write(dir.path().join("a.lgt"), SOURCE).expect("write a.lgt");
    dir
}

/// Run retalk in `dir` and return (stdout, stderr, exit_code).
fn run_retalk(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_retalk"))
        .arg("--workspace")
        .arg(dir)
        .args(args)
        .output()
        .expect("failed to execute retalk");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).expect("read file")
}

// ============================================================================
// actions
// ============================================================================

#[test]
fn actions_lists_predicate_refactorings() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(dir.path(), &["actions", "--at", "a.lgt:5:2"]);
    assert_eq!(exit_code, 0);

    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["status"], "ok");
    let commands: Vec<&str> = json["actions"]
        .as_array()
        .expect("actions array")
        .iter()
        .filter_map(|a| a["command"].as_str())
        .collect();
    assert!(commands.contains(&"logtalk.refactor.addArgument"));
    assert!(commands.contains(&"logtalk.refactor.removeArgument"));
}

#[test]
fn actions_on_a_blank_line_is_empty() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(dir.path(), &["actions", "--at", "a.lgt:2:1"]);
    assert_eq!(exit_code, 0);
    let json: Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["actions"].as_array().map(Vec::len), Some(0));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_applies_and_reports_json() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(
        dir.path(),
        &["run", "addArgument", "--at", "a.lgt:5:2", "--answer", "Y", "--answer", "2"],
    );
    assert_eq!(exit_code, 0, "stdout: {}", stdout);

    let json: Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["command"], "logtalk.refactor.addArgument");
    assert_eq!(json["applied"], true);

    let text = read(dir.path(), "a.lgt");
    assert!(text.contains(":- public(foo/2)."));
    assert!(text.contains("foo(X, Y) :- bar(X)."));
}

#[test]
fn dry_run_prints_a_diff_and_writes_nothing() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(
        dir.path(),
        &["run", "removeArgument", "--at", "a.lgt:3:13", "--dry-run"],
    );
    assert_eq!(exit_code, 0);
    assert!(stdout.contains("public(foo/0)"));
    assert_eq!(read(dir.path(), "a.lgt"), SOURCE);
}

#[test]
fn text_format_summarizes() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(
        dir.path(),
        &["run", "removeArgument", "--at", "a.lgt:3:13", "--format", "text"],
    );
    assert_eq!(exit_code, 0);
    assert!(stdout.starts_with("applied "));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unknown_refactoring_at_location_is_exit_3() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) =
        run_retalk(dir.path(), &["run", "inlineVariable", "--at", "a.lgt:2:1"]);
    assert_eq!(exit_code, 3);
    let json: Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 3);
}

#[test]
fn malformed_location_is_exit_2() {
    let dir = workspace();
    let (_stdout, _stderr, exit_code) =
        run_retalk(dir.path(), &["run", "addArgument", "--at", "a.lgt"]);
    assert_eq!(exit_code, 2);
}

#[test]
fn prompts_without_answers_off_a_tty_are_exit_2() {
    let dir = workspace();
    let (_stdout, _stderr, exit_code) =
        run_retalk(dir.path(), &["run", "addArgument", "--at", "a.lgt:5:2"]);
    assert_eq!(exit_code, 2);
    assert_eq!(read(dir.path(), "a.lgt"), SOURCE);
}

#[test]
fn failed_precondition_is_exit_5() {
    let dir = workspace();
    let (stdout, _stderr, exit_code) = run_retalk(
        dir.path(),
        &["run", "convertEntity", "--kind", "protocol", "--at", "a.lgt:1:12"],
    );
    assert_eq!(exit_code, 5, "stdout: {}", stdout);
    assert_eq!(read(dir.path(), "a.lgt"), SOURCE);
}
