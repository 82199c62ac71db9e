//! CLI regression tests for the `refract` binary.
//!
//! These tests invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes, and output formats.
//!
//! Run with: `cargo test -p refract-test`
//! Requires the `refract` binary to be built first (`cargo build -p refract`).

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

use crate::sample;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns an assert_cmd Command wrapping the `refract` binary.
fn refract() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("refract")
        .expect("refract binary not found, run `cargo build -p refract` first");
    cmd.env_remove("RUST_LOG")
        .env_remove("REFRACT_LOG_LEVEL")
        .env_remove("REFRACT_LOG_FORMAT");
    cmd
}

/// Absolute path to the shared test fixtures directory.
fn fixtures() -> PathBuf {
    // CARGO_MANIFEST_DIR = .../crates/refract-test
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("crates/")
        .parent()
        .expect("workspace root")
        .join("tests/fixtures")
}

/// Writes a manifest registering the sample plugin and returns its path.
fn sample_manifest(dir: &Path) -> PathBuf {
    #[allow(deprecated)]
    let plugin = assert_cmd::cargo::cargo_bin("refract-ext-sample");
    let manifest = dir.join("refract.yaml");
    std::fs::write(
        &manifest,
        format!(
            "extensions:\n  - name: sample\n    command: {}\n",
            plugin.display()
        ),
    )
    .expect("write manifest");
    manifest
}

fn stdout_json(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

// ---------------------------------------------------------------------------
// refract compile
// ---------------------------------------------------------------------------

#[test]
fn compile_keeps_refs_by_default() {
    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success()
        .stdout(contains("operationId: listPets"))
        .stdout(contains("shared.yaml#/responses/PetList"))
        .stderr(contains("0 extension(s) handled, 0 $ref(s) inlined"));
}

#[test]
fn compile_inline_refs_json() {
    let assert = refract()
        .args(["compile", "--inline-refs", "--format", "json", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success()
        .stderr(contains("3 $ref(s) inlined"));

    let doc = stdout_json(&assert.get_output().stdout);
    let get = &doc["paths"]["/pets"]["get"];
    assert_eq!(get["parameters"][0]["name"], "limit");
    assert_eq!(get["responses"]["200"]["description"], "A list of pets");
    let items = &get["responses"]["200"]["content"]["application/json"]["schema"]["items"];
    assert_eq!(items["type"], "object");
    assert_eq!(items["x-unknown-vendor"], "kept as-is");
}

#[test]
fn compile_writes_output_file() {
    let tmp = TempDir::new().expect("temp dir");
    let out = tmp.path().join("compiled.yaml");

    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&out).expect("output written");
    assert!(written.starts_with("openapi:"));
    assert!(written.contains("operationId: listPets"));
}

#[test]
fn compile_dispatches_extensions_to_plugin() {
    let tmp = TempDir::new().expect("temp dir");
    let manifest = sample_manifest(tmp.path());

    refract()
        .args(["compile", "--inline-refs", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(contains("owner: pets-team"))
        .stderr(contains("1 extension(s) handled"))
        .stderr(contains(format!("$root.info.{} -> sample", sample::ECHO)));
}

#[test]
fn compile_extension_errors_exit_one() {
    let tmp = TempDir::new().expect("temp dir");
    let manifest = sample_manifest(tmp.path());

    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("extension-fail.yaml"))
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1005"))
        .stderr(contains(format!("$root.info.{}", sample::FAIL)))
        .stderr(contains("rejected by sample plugin"));
}

#[test]
fn compile_crashing_plugin_exits_one() {
    let tmp = TempDir::new().expect("temp dir");
    let manifest = sample_manifest(tmp.path());

    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("extension-crash.yaml"))
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1006"))
        .stderr(contains("crash requested"));
}

#[test]
fn compile_without_plugins_leaves_extensions_raw() {
    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("extension-fail.yaml"))
        .assert()
        .success()
        .stdout(contains("x-sample-fail: true"));
}

#[test]
fn compile_cycle_with_inline_refs_exits_one() {
    refract()
        .args(["compile", "--inline-refs", "--spec"])
        .arg(fixtures().join("cycle.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1007"));
}

#[test]
fn compile_cycle_without_inlining_succeeds() {
    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("cycle.yaml"))
        .assert()
        .success();
}

#[test]
fn compile_missing_ref_names_segment() {
    refract()
        .args(["compile", "--inline-refs", "--spec"])
        .arg(fixtures().join("missing-ref.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1004"))
        .stderr(contains("definitions/Missing"))
        .stderr(contains("error: $root.paths./pets.get.responses.200.schema:"));
}

#[test]
fn compile_invalid_spec_exits_one() {
    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("invalid-parse.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1003"));
}

#[test]
fn compile_nonexistent_spec_exits_one() {
    let tmp = TempDir::new().expect("temp dir");

    refract()
        .args(["compile", "--spec"])
        .arg(tmp.path().join("nonexistent.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1002"));
}

#[test]
fn compile_missing_spec_flag_exits_two() {
    refract().args(["compile"]).assert().failure().code(2);
}

#[test]
fn compile_unknown_format_exits_two() {
    refract()
        .args(["compile", "--format", "toml", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn compile_invalid_manifest_exits_one() {
    let tmp = TempDir::new().expect("temp dir");
    let manifest = tmp.path().join("refract.yaml");
    std::fs::write(&manifest, "plugins: {}\n").expect("write manifest");

    refract()
        .args(["compile", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .code(1)
        .stderr(contains("E1010"));
}

#[test]
fn json_logs_go_to_stderr() {
    let assert = refract()
        .args(["--log-level", "info", "--log-format", "json", "compile", "--format", "json", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success()
        .stderr(contains("\"event\":\"compile_started\""));

    // stdout stays parseable even with logging on.
    stdout_json(&assert.get_output().stdout);
}

#[test]
fn log_format_from_env() {
    refract()
        .env("REFRACT_LOG_LEVEL", "info")
        .env("REFRACT_LOG_FORMAT", "json")
        .args(["compile", "--spec"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success()
        .stderr(contains("\"event\":\"compile_finished\""));
}

// ---------------------------------------------------------------------------
// refract resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_cross_document_fragment() {
    refract()
        .args(["resolve", "--ref", "shared.yaml#/schemas/Pet/properties/name", "--base"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success()
        .stdout("type: string\n");
}

#[test]
fn resolve_same_document_json() {
    let assert = refract()
        .args(["resolve", "--format", "json", "--ref", "#/components/parameters/Limit", "--base"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .success();

    let limit = stdout_json(&assert.get_output().stdout);
    assert_eq!(limit["in"], "query");
    assert_eq!(limit["schema"]["maximum"], 100);
}

#[test]
fn resolve_missing_segment_exits_one() {
    refract()
        .args(["resolve", "--ref", "#/definitions/Missing", "--base"])
        .arg(fixtures().join("missing-ref.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("unresolved $ref '#/definitions/Missing': nothing at 'definitions/Missing'"));
}

#[test]
fn resolve_out_of_range_index_exits_one() {
    refract()
        .args(["resolve", "--ref", "#/paths/~1pets/get/parameters/5", "--base"])
        .arg(fixtures().join("petstore.yaml"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("paths/~1pets/get/parameters/5"));
}
