use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn cbx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("cbx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();

    fs::write(
        docs_dir.join("alpha.md"),
        "<!-- ormd:0.1 -->\n---\ntitle: Alpha Deployment Notes\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\n\nRollback procedure for the api tier. Mentions kubernetes.\n",
    )
    .unwrap();
    fs::write(
        docs_dir.join("beta.md"),
        "<!-- ormd:0.1 -->\n---\ntitle: Beta Billing Runbook\ndates:\n  created: '2024-02-01T00:00:00Z'\ncontext:\n  resolution:\n    confidence: validated\n---\n\nBilling reconciliation runbook for finance.\n",
    )
    .unwrap();
    fs::write(
        docs_dir.join("plain.md"),
        "# Just markdown\n\nNo frontmatter here.\n",
    )
    .unwrap();
    fs::write(
        docs_dir.join("uncommented.md"),
        "---\ntitle: No Version Tag\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\n\nBody text.\n",
    )
    .unwrap();
    fs::write(
        docs_dir.join("invalid.md"),
        "<!-- ormd:0.1 -->\n---\ntitle: Broken\nstatus: published\ndates:\n  created: '2024-01-01T00:00:00Z'\nlinks:\n  - id: l1\n    rel: supports\n---\n\nBody.\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/cbx.sqlite"

[search]
default_limit = 10
page_size = 20
"#,
        root.display()
    );

    let config_path = config_dir.join("cbx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_cbx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = cbx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run cbx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn doc_path(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("docs")
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_cbx(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_cbx(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_cbx(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_parse_outputs_metadata() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "alpha.md");

    let (stdout, stderr, success) = run_cbx(&config_path, &["parse", &file]);
    assert!(success, "parse failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Alpha Deployment Notes"));
    assert!(stdout.contains("Rollback procedure"));
    assert!(!stdout.contains("warning:"));
}

#[test]
fn test_parse_missing_frontmatter_fails() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "plain.md");

    let (_, stderr, success) = run_cbx(&config_path, &["parse", &file]);
    assert!(!success);
    assert!(stderr.contains("Invalid ORMD format: missing YAML frontmatter"));
}

#[test]
fn test_parse_warns_on_missing_version_comment() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "uncommented.md");

    let (stdout, _, success) = run_cbx(&config_path, &["parse", &file]);
    assert!(success, "warning should not fail the parse");
    assert!(stdout.contains("warning: Missing ORMD version comment"));
}

#[test]
fn test_parse_json_output() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "alpha.md");

    let (stdout, _, success) = run_cbx(&config_path, &["parse", &file, "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["metadata"]["title"], "Alpha Deployment Notes");
}

#[test]
fn test_validate_reports_every_violation() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "invalid.md");

    let (_, stderr, success) = run_cbx(&config_path, &["validate", &file]);
    assert!(!success);
    assert!(stderr.contains("Invalid status value: published"));
    assert!(stderr.contains("Link at index 0 is incomplete"));
}

#[test]
fn test_validate_ok() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "alpha.md");

    let (stdout, _, success) = run_cbx(&config_path, &["validate", &file]);
    assert!(success);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_convert_applies_defaults() {
    let (_tmp, config_path) = setup_test_env();
    let file = doc_path(&config_path, "alpha.md");

    let (stdout, _, success) = run_cbx(&config_path, &["convert", &file, "--id", "urn:cb:CONV1"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["id"], "urn:cb:CONV1");
    assert_eq!(value["version"], "1.0");
    assert_eq!(value["resolution"]["confidence"], "working");
    assert_eq!(value["policy"]["access_level"], "public");
    assert_eq!(value["frame"]["type"], "ormd.document");
    assert_eq!(value["frame"]["scope"], "local");
}

#[test]
fn test_store_and_get_roundtrip() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let file = doc_path(&config_path, "alpha.md");

    let (stdout, stderr, success) =
        run_cbx(&config_path, &["store", &file, "--id", "urn:cb:STORE1"]);
    assert!(success, "store failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("stored urn:cb:STORE1"));
    assert!(stdout.contains("confidence:working"));

    let (stdout, _, success) = run_cbx(&config_path, &["get", "urn:cb:STORE1"]);
    assert!(success);
    assert!(stdout.contains("urn:cb:STORE1"));
    assert!(stdout.contains("confidence: working"));
    assert!(stdout.contains("Rollback procedure"));
}

#[test]
fn test_store_duplicate_id_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let file = doc_path(&config_path, "alpha.md");

    run_cbx(&config_path, &["store", &file, "--id", "urn:cb:DUP1"]);
    let (_, stderr, success) = run_cbx(&config_path, &["store", &file, "--id", "urn:cb:DUP1"]);
    assert!(!success);
    assert!(stderr.contains("already stored"));
}

#[test]
fn test_update_replaces_stored_bundle() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:UPD1"]);

    let (stdout, stderr, success) =
        run_cbx(&config_path, &["update", &beta, "--id", "urn:cb:UPD1"]);
    assert!(success, "update failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("updated urn:cb:UPD1"));

    let (stdout, _, _) = run_cbx(&config_path, &["get", "urn:cb:UPD1"]);
    assert!(stdout.contains("Billing reconciliation"));
    assert!(!stdout.contains("Rollback procedure"));
}

#[test]
fn test_update_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");

    let (_, stderr, success) =
        run_cbx(&config_path, &["update", &alpha, "--id", "urn:cb:NOPE"]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_store_batch() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");

    let (stdout, stderr, success) = run_cbx(&config_path, &["store", &alpha, &beta]);
    assert!(success, "batch store failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(stdout.matches("stored urn:cb:").count(), 2);

    let (stdout, _, _) = run_cbx(&config_path, &["query", "--tag", "scope:local"]);
    assert_eq!(stdout.matches("urn:cb:").count(), 2);
}

#[test]
fn test_store_batch_rejects_explicit_id() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");

    let (_, stderr, success) = run_cbx(
        &config_path,
        &["store", &alpha, &beta, "--id", "urn:cb:ONE"],
    );
    assert!(!success);
    assert!(stderr.contains("single input file"));
}

#[test]
fn test_get_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);

    let (_, stderr, success) = run_cbx(&config_path, &["get", "urn:cb:NOPE"]);
    assert!(!success);
    assert!(stderr.contains("bundle not found"));
}

#[test]
fn test_search_scans_content() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:S1"]);
    run_cbx(&config_path, &["store", &beta, "--id", "urn:cb:S2"]);

    let (stdout, _, success) = run_cbx(&config_path, &["search", "KUBERNETES"]);
    assert!(success);
    assert!(stdout.contains("urn:cb:S1"));
    assert!(!stdout.contains("urn:cb:S2"));

    let (stdout, _, success) = run_cbx(&config_path, &["search", "no such phrase"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_query_filters_by_confidence() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:Q1"]);
    run_cbx(&config_path, &["store", &beta, "--id", "urn:cb:Q2"]);

    let (stdout, _, success) =
        run_cbx(&config_path, &["query", "--confidence", "validated"]);
    assert!(success);
    assert!(stdout.contains("urn:cb:Q2"));
    assert!(!stdout.contains("urn:cb:Q1"));

    let (stdout, _, success) = run_cbx(
        &config_path,
        &["query", "--tag", "scope:local", "--sort", "id"],
    );
    assert!(success);
    assert!(stdout.contains("urn:cb:Q1"));
    assert!(stdout.contains("urn:cb:Q2"));
}

#[test]
fn test_query_rejects_unknown_sort() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);

    let (_, stderr, success) = run_cbx(&config_path, &["query", "--sort", "newest"]);
    assert!(!success);
    assert!(stderr.contains("Unknown sort order"));
}

#[test]
fn test_relate_and_related() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    let beta = doc_path(&config_path, "beta.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:R1"]);
    run_cbx(&config_path, &["store", &beta, "--id", "urn:cb:R2"]);

    let (stdout, stderr, success) = run_cbx(
        &config_path,
        &[
            "relate", "urn:cb:R1", "urn:cb:R2", "--rel", "supports", "--strength", "0.8",
        ],
    );
    assert!(success, "relate failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("urn:cb:R1 -[supports 0.80]-> urn:cb:R2"));

    let (stdout, _, success) = run_cbx(&config_path, &["related", "urn:cb:R2"]);
    assert!(success);
    assert!(stdout.contains("urn:cb:R1 -[supports 0.80]-> urn:cb:R2"));
}

#[test]
fn test_relate_unknown_endpoint_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:R1"]);

    let (_, stderr, success) = run_cbx(
        &config_path,
        &["relate", "urn:cb:R1", "urn:cb:MISSING", "--rel", "supports"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown bundle"));
}

#[test]
fn test_delete_removes_bundle() {
    let (_tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let alpha = doc_path(&config_path, "alpha.md");
    run_cbx(&config_path, &["store", &alpha, "--id", "urn:cb:D1"]);

    let (stdout, _, success) = run_cbx(&config_path, &["delete", "urn:cb:D1"]);
    assert!(success);
    assert!(stdout.contains("deleted urn:cb:D1"));

    let (_, _, success) = run_cbx(&config_path, &["get", "urn:cb:D1"]);
    assert!(!success);
}

#[test]
fn test_handoff_generates_and_stores() {
    let (tmp, config_path) = setup_test_env();
    run_cbx(&config_path, &["init"]);
    let out = tmp.path().join("handoff.md");

    let (stdout, stderr, success) = run_cbx(
        &config_path,
        &[
            "handoff",
            "--title",
            "Billing migration handoff",
            "--task",
            "Move billing endpoints to the new gateway.",
            "--decision",
            "Keep v1 routes until Q3",
            "--next-step",
            "Port webhook handlers",
            "--out",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "handoff failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("stored urn:cb:"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("<!-- ormd:0.1 -->"));
    assert!(written.contains("## Task"));
    assert!(written.contains("- Keep v1 routes until Q3"));

    // The stored bundle is searchable like any other.
    let (stdout, _, success) = run_cbx(&config_path, &["search", "webhook handlers"]);
    assert!(success);
    assert!(stdout.contains("urn:cb:"));
}
