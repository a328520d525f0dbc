//! CLI exit-code and output contract (§6): `validate`/`run`/`explain`
//! against a real `visor.yaml` on disk, driven through the compiled
//! binary rather than the library API.

use assert_cmd::Command;
use predicates::prelude::*;

fn write_config(dir: &tempfile::TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("visor.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn validate_accepts_a_well_formed_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  hello:
    type: noop
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK: 1 checks configured"));
}

#[test]
fn validate_rejects_on_finish_without_for_each() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  hello:
    type: noop
    on_finish:
      run: [hello]
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "validate"])
        .assert()
        .failure();
}

#[test]
fn validate_rejects_a_dependency_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  a:
    type: noop
    depends_on: b
  b:
    type: noop
    depends_on: a
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .failure();
}

#[test]
fn run_exits_zero_on_a_clean_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  hello:
    type: noop
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "run", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 issues"));
}

#[test]
fn run_exits_three_when_a_failure_condition_fires() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  gate:
    type: transform
    transform_js: "return { bad: true };"
    failure_conditions:
      always_bad:
        condition: "output.bad"
        message: "bad output"
        severity: error
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(3);
}

#[test]
fn run_exits_four_when_a_halting_condition_fires() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  gate:
    type: transform
    transform_js: "return { critical: true };"
    failure_conditions:
      must_halt:
        condition: "output.critical"
        message: "halting"
        severity: critical
        halt_execution: true
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "run"])
        .assert()
        .code(4);
}

#[test]
fn explain_prints_levels_and_any_of_groups() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        r#"
checks:
  parse-pr:
    type: noop
  parse-comment:
    type: noop
  triage:
    type: noop
    depends_on: "parse-pr|parse-comment"
"#,
    );
    Command::cargo_bin("visor")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "explain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("any(parse-pr|parse-comment)"));
}
