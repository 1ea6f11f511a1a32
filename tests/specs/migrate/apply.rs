//! `tern migrate --apply` happy paths

use crate::prelude::*;

#[test]
fn apply_runs_pending_in_order_and_cleans_up() {
    let ws = Workspace::init();
    ws.manifest(&[("b", "second", &["a"]), ("a", "first", &[])]);
    ws.script("a", &write_step("notes/a.txt", "from a"));
    ws.script("b", r#"{ "steps": [{ "op": "rename", "from": "notes/a.txt", "to": "notes/b.txt" }] }"#);

    ws.tern()
        .args(&["migrate", "--apply"])
        .passes()
        .stdout_eq("applied     a\napplied     b\n\nApplied 2 migration(s)\n");

    assert_eq!(ws.applied(), vec!["a", "b"]);
    assert_eq!(ws.read("notes/b.txt"), "from a");
    assert!(!ws.exists("notes/a.txt"));
    assert!(ws.backups().is_empty(), "batch backup is removed on success");
}

#[test]
fn second_apply_is_a_no_op() {
    let ws = Workspace::init();
    ws.manifest(&[("a", "first", &[])]);
    ws.script("a", &write_step("a.txt", "a"));
    ws.tern().args(&["migrate", "--apply"]).passes();
    let state = ws.read(".tern/state.json");

    ws.tern()
        .args(&["migrate", "--apply"])
        .passes()
        .stdout_eq("Nothing to migrate; workspace is up to date\n");
    assert_eq!(ws.read(".tern/state.json"), state);
}

#[test]
fn already_applied_migrations_are_skipped() {
    let ws = Workspace::init();
    ws.manifest(&[("x", "old", &[]), ("y", "new", &["x"])]);
    ws.script("x", &fail_step("x must not run"));
    ws.script("y", &write_step("y.txt", "y"));
    ws.file(
        ".tern/state.json",
        &ws.read(".tern/state.json").replace(
            "\"appliedMigrations\": []",
            "\"appliedMigrations\": [{\"id\": \"x\", \"appliedAt\": \"2026-01-01T00:00:00Z\"}]",
        ),
    );

    ws.tern().args(&["migrate", "--apply"]).passes();
    assert_eq!(ws.applied(), vec!["x", "y"]);
}

#[test]
fn apply_requires_state() {
    let ws = Workspace::empty();
    ws.manifest(&[("a", "first", &[])]);
    ws.script("a", &write_step("a.txt", "a"));
    ws.tern()
        .args(&["migrate", "--apply"])
        .fails()
        .exit_code(1)
        .stderr_has("workspace state not found");
    assert!(!ws.exists("a.txt"));
}

#[test]
fn missing_body_fails_before_any_backup() {
    let ws = Workspace::init();
    ws.manifest(&[("a", "first", &[])]);
    ws.tern()
        .args(&["migrate", "--apply"])
        .fails()
        .exit_code(1)
        .stderr_has("no implementation registered for migration 'a'");
    assert!(ws.backups().is_empty());
}

#[test]
fn apply_json_reports_run_result() {
    let ws = Workspace::init();
    ws.manifest(&[("a", "first", &[])]);
    ws.script("a", &write_step("a.txt", "a"));

    let result = ws
        .tern()
        .args(&["migrate", "--apply", "-o", "json"])
        .passes()
        .json();
    assert_eq!(result["success"], true);
    assert_eq!(result["applied"][0]["id"], "a");
    assert_eq!(result["pending"], serde_json::json!(["a"]));
}

#[test]
fn json_set_edits_documents() {
    let ws = Workspace::init();
    ws.file("package.json", r#"{"name": "deck"}"#);
    ws.manifest(&[("node", "pin node", &[])]);
    ws.script(
        "node",
        r#"{ "steps": [{ "op": "jsonSet", "path": "package.json", "pointer": "/engines/node", "value": ">=20" }] }"#,
    );

    ws.tern().args(&["migrate", "--apply"]).passes();
    let doc: serde_json::Value = serde_json::from_str(&ws.read("package.json")).unwrap();
    assert_eq!(doc["engines"]["node"], ">=20");
}
