//! End-to-end tests for the podup CLI
//!
//! These tests verify:
//! - Argument handling and help output
//! - Failures that are detected before any network access
//! - Exit codes and JSON error output
//! - Files are left untouched when an update fails

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const LOCKFILE: &str = "PODS:
  - Alamofire (3.0.1)
  - Nimble (2.0.0)

DEPENDENCIES:
  - Alamofire (~> 3.0.0)
  - Nimble (~> 2.0.0)

SPEC CHECKSUMS:
  Alamofire: 0ba4eeb6b1e8e8fd22bf1d6c0e3a3ff7ad0b0e8b
  Nimble: 415e3aa3267e7bc2c96b05fa814ddea7bb686a29

PODFILE CHECKSUM: 0000000000000000000000000000000000000000

COCOAPODS: 1.2.1
";

/// Create a project directory holding a Podfile and Podfile.lock
fn create_project(podfile: &str, lockfile: &str) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("Podfile"), podfile).unwrap();
    fs::write(temp_dir.path().join("Podfile.lock"), lockfile).unwrap();
    temp_dir
}

fn podup(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("podup").unwrap();
    cmd.arg("--podfile").arg(dir.path().join("Podfile"));
    cmd
}

const AMBIGUOUS_PODFILE: &str = "target 'App' do
  pod 'Alamofire', '~> 3.0.0'
end

target 'AppTests' do
  pod 'Alamofire', '~> 3.0.0'
  pod 'Nimble', '~> 2.0.0'
end
";

#[test]
fn test_help() {
    Command::cargo_bin("podup")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dependency"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version() {
    Command::cargo_bin("podup")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_dependency_argument() {
    Command::cargo_bin("podup")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dependency"));
}

#[test]
fn test_json_and_diff_are_exclusive() {
    Command::cargo_bin("podup")
        .unwrap()
        .args(["--dependency", "Alamofire", "--json", "--diff"])
        .assert()
        .failure();
}

#[test]
fn test_ambiguous_declaration_exits_with_one() {
    let dir = create_project(AMBIGUOUS_PODFILE, LOCKFILE);

    podup(&dir)
        .args(["--dependency", "Alamofire", "--requirement", "~> 4.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("exactly one declaration"))
        .stderr(predicate::str::contains("found 2"));

    // Nothing is written on failure
    let podfile = fs::read_to_string(dir.path().join("Podfile")).unwrap();
    assert_eq!(podfile, AMBIGUOUS_PODFILE);
    let lockfile = fs::read_to_string(dir.path().join("Podfile.lock")).unwrap();
    assert_eq!(lockfile, LOCKFILE);
}

#[test]
fn test_undeclared_dependency_json_error() {
    let dir = create_project("pod 'Nimble', '~> 2.0.0'\n", LOCKFILE);

    let output = podup(&dir)
        .args(["--dependency", "Alamofire", "--requirement", "~> 4.0.0", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["error"]["kind"], "ambiguous_declaration");
    assert_eq!(value["error"]["transient"], false);
    assert!(value["error"]["message"]
        .as_str()
        .unwrap()
        .contains("found 0"));
}

#[test]
fn test_malformed_lockfile() {
    let dir = create_project(
        "pod 'Alamofire', '~> 3.0.0'\n",
        "PODS:\n   - Alamofire (3.0.1)\n",
    );

    podup(&dir)
        .args(["--dependency", "Alamofire", "--requirement", "~> 4.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Podfile.lock"));
}

#[test]
fn test_missing_podfile() {
    let dir = tempfile::tempdir().unwrap();

    podup(&dir)
        .args(["--dependency", "Alamofire"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_invalid_config() {
    let dir = create_project(AMBIGUOUS_PODFILE, LOCKFILE);
    fs::write(dir.path().join("podup.toml"), "[retry]\nmax_attempts = 0\n").unwrap();

    podup(&dir)
        .args(["--dependency", "Alamofire", "--requirement", "~> 4.0.0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("retry.max_attempts"));
}

#[test]
fn test_invalid_credentials_file() {
    let dir = create_project(AMBIGUOUS_PODFILE, LOCKFILE);
    let credentials = dir.path().join("credentials.json");
    fs::write(&credentials, "not json").unwrap();

    podup(&dir)
        .args(["--dependency", "Alamofire"])
        .arg("--credentials")
        .arg(&credentials)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("credentials"));
}
