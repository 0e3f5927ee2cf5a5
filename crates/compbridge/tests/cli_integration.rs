//! CLI integration tests for the compbridge command-line interface.
//!
//! Each test runs in its own temporary directory with a project-local
//! config that keeps the snippet store and logs inside it.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Workspace with an isolated config dir and a local store.
fn workspace() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("compbridge.toml"),
        "[store]\npath = \"snippets.json\"\n\n[logging]\nfile = false\n",
    )
    .unwrap();
    dir
}

/// Get a command for the compbridge binary running in `dir`.
fn compbridge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("compbridge").unwrap();
    cmd.current_dir(dir)
        .env("COMPBRIDGE_CONFIG_DIR", dir.join("config"));
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let dir = workspace();
    compbridge(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("live preview"))
        .stdout(predicate::str::contains("snippets"));
}

#[test]
fn test_version_displays() {
    let dir = workspace();
    compbridge(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("compbridge"));
}

#[test]
fn test_data_flags_conflict() {
    let dir = workspace();
    compbridge(dir.path())
        .args(["preview", "x.jsx", "--data", "{}", "--data-file", "d.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_preview_renders_markup() {
    let dir = workspace();
    write(
        dir.path(),
        "greeting.jsx",
        "const Greeting = ({ name }) => <h1 className=\"title\">Hello {name}</h1>;",
    );
    compbridge(dir.path())
        .args(["preview", "greeting.jsx", "--data", r#"{"name": "Ada"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1 class=\"title\">Hello Ada</h1>"));
}

#[test]
fn test_preview_runtime_error_fails() {
    let dir = workspace();
    write(
        dir.path(),
        "boom.jsx",
        "const X = () => { throw new Error(\"boom\") }",
    );
    compbridge(dir.path())
        .args(["--json", "preview", "boom.jsx"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"kind\": \"runtime\""))
        .stdout(predicate::str::contains("boom"));
}

#[test]
fn test_preview_empty_output_warns() {
    let dir = workspace();
    write(
        dir.path(),
        "blank.jsx",
        "const X = ({n}) => (n>0 ? <div>{n}</div> : null)",
    );
    compbridge(dir.path())
        .args(["preview", "blank.jsx", "--data", r#"{"n": 0}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("produced no visible output"));
}

#[test]
fn test_preview_invalid_input_is_validation_only() {
    let dir = workspace();
    write(dir.path(), "card.jsx", "const Card = () => <div>card</div>;");
    compbridge(dir.path())
        .args(["preview", "card.jsx", "--data", "{oops"])
        .assert()
        .success()
        .stdout(predicate::str::contains("input: invalid JSON"))
        .stdout(predicate::str::contains("<div>card</div>"));
}

#[test]
fn test_preview_html_page() {
    let dir = workspace();
    write(dir.path(), "card.jsx", "const Card = () => <div>card</div>;");
    compbridge(dir.path())
        .args(["preview", "card.jsx", "--html"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<!DOCTYPE html>"))
        .stdout(predicate::str::contains("const entry = \"Card\";"));
}

#[test]
fn test_preview_missing_file() {
    let dir = workspace();
    compbridge(dir.path())
        .args(["preview", "nope.jsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read component source"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_export_writes_svg() {
    let dir = workspace();
    write(dir.path(), "card.jsx", "const Card = () => <div>card</div>;");
    compbridge(dir.path())
        .args(["export", "card.jsx", "--out", "out/card.svg"])
        .assert()
        .success();
    let svg = std::fs::read_to_string(dir.path().join("out/card.svg")).unwrap();
    assert!(svg.contains("<foreignObject"));
    assert!(svg.contains("<div>card</div>"));
}

#[test]
fn test_export_without_output_fails() {
    let dir = workspace();
    write(dir.path(), "none.jsx", "const None = () => null;");
    compbridge(dir.path())
        .args(["export", "none.jsx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No rendered output to export"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Snippets and Templates
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_snippet_lifecycle() {
    let dir = workspace();
    write(dir.path(), "badge.jsx", "const Badge = ({ label }) => <span>{label}</span>;");
    write(dir.path(), "badge.json", r#"{"label": "new"}"#);

    let output = compbridge(dir.path())
        .args([
            "--json", "snippets", "save", "badge.jsx", "--name", "Badge", "--tag", "status",
            "--data-file", "badge.json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let saved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let id = saved["id"].as_u64().unwrap().to_string();

    compbridge(dir.path())
        .args(["snippets", "search", "STATUS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Badge"));

    compbridge(dir.path())
        .args(["snippets", "open", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("<span>new</span>"));

    compbridge(dir.path())
        .args(["snippets", "delete", &id])
        .assert()
        .success();

    compbridge(dir.path())
        .args(["snippets", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snippets found."));
}

#[test]
fn test_snippet_save_requires_name() {
    let dir = workspace();
    write(dir.path(), "x.jsx", "const X = () => <b/>;");
    compbridge(dir.path())
        .args(["snippets", "save", "x.jsx", "--name", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("snippet name is required"));
}

#[test]
fn test_templates_list_and_preview() {
    let dir = workspace();
    compbridge(dir.path())
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Navigation"))
        .stdout(predicate::str::contains("Profile Card"));

    compbridge(dir.path())
        .args(["templates", "preview", "tab navigation"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Overview"))
        .stdout(predicate::str::contains("Reviews"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_init_local() {
    let dir = tempfile::tempdir().unwrap();
    compbridge(dir.path())
        .args(["config", "init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    let written = std::fs::read_to_string(dir.path().join("compbridge.toml")).unwrap();
    let config = compbridge_config::CompbridgeConfig::from_toml(&written).unwrap();
    assert_eq!(config.preview().settle_delay_ms, 100);
}

#[test]
fn test_config_path_honors_env() {
    let dir = workspace();
    compbridge(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
