//! End-to-end CLI tests for the citegraph binary.

#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const JATS: &str = r#"<article><body><p>Cited [1-2].</p></body><back><ref-list>
    <ref id="r1"><label>1</label><mixed-citation>One.</mixed-citation></ref>
    <ref id="r2"><label>2</label><mixed-citation>Two.</mixed-citation></ref>
</ref-list></back></article>"#;

fn citegraph(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("citegraph").unwrap();
    // Isolate from any real user config
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    citegraph(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Extract bibliographies"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    citegraph(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("citegraph"));
}

/// Test that missing inputs cause non-zero exit.
#[test]
fn test_binary_without_inputs_returns_error() {
    let home = TempDir::new().unwrap();
    citegraph(&home)
        .assert()
        .failure()
        .stderr(predicate::str::contains("INPUTS"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    citegraph(&home)
        .args(["--invalid-flag", "a.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_writes_json_lines_to_stdout() {
    let home = TempDir::new().unwrap();
    let corpus = TempDir::new().unwrap();
    std::fs::write(corpus.path().join("10.1000_x.xml"), JATS).unwrap();

    let assert = citegraph(&home)
        .arg("-q")
        .arg(corpus.path())
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let graph: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(graph["document_id"], "10.1000_x");
    assert_eq!(graph["schema"], "jats");
    assert_eq!(
        graph["resolved_citations"][0]["entry_ids"],
        serde_json::json!(["r1", "r2"])
    );
}

#[test]
fn test_binary_output_file_and_report() {
    let home = TempDir::new().unwrap();
    let corpus = TempDir::new().unwrap();
    let input = corpus.path().join("paper.xml");
    std::fs::write(&input, JATS).unwrap();
    let output = corpus.path().join("graphs.jsonl");

    citegraph(&home)
        .arg("-q")
        .arg("--report")
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Coverage: 100.0%"));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written.lines().count(), 1);
    assert!(written.contains("\"document_id\":\"paper\""));
}

#[test]
fn test_binary_reads_config_file() {
    let home = TempDir::new().unwrap();
    let corpus = TempDir::new().unwrap();
    let input = corpus.path().join("paper.xml");
    std::fs::write(&input, JATS).unwrap();
    let output = corpus.path().join("from-config.jsonl");
    let config = corpus.path().join("citegraph.toml");
    std::fs::write(
        &config,
        format!(
            "concurrency = 2\nverbosity = \"quiet\"\noutput = \"{}\"\n",
            output.display()
        ),
    )
    .unwrap();

    citegraph(&home)
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .assert()
        .success();

    assert!(output.exists());
}

#[test]
fn test_binary_rejects_invalid_config() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("bad.toml");
    std::fs::write(&config, "concurrency = 0\n").unwrap();

    citegraph(&home)
        .arg("--config")
        .arg(&config)
        .arg("paper.xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("concurrency"));
}

#[test]
fn test_binary_unreadable_input_still_succeeds() {
    let home = TempDir::new().unwrap();
    citegraph(&home)
        .args(["-q", "--report", "/definitely/missing.xml"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("1 unreadable"));
}
