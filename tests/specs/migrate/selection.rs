//! Affected-item selection before apply

use crate::prelude::*;

const DECK_SCRIPT: &str = r#"{
  "affects": { "glob": "decks/*/package.json", "versionPointer": "/version" },
  "steps": [
    { "op": "jsonSet", "path": "{item}/package.json", "pointer": "/migrated", "value": true }
  ]
}"#;

fn decks() -> Workspace {
    let ws = Workspace::init();
    ws.file("decks/intro/package.json", r#"{"version": "1.0.0"}"#);
    ws.file("decks/outro/package.json", r#"{"version": "2.0.0"}"#);
    ws.manifest(&[("mark", "mark decks", &[])]);
    ws.script("mark", DECK_SCRIPT);
    ws
}

fn migrated(ws: &Workspace, deck: &str) -> bool {
    let doc: serde_json::Value =
        serde_json::from_str(&ws.read(format!("decks/{}/package.json", deck))).unwrap();
    doc["migrated"] == true
}

#[test]
fn without_a_terminal_selection_needs_yes() {
    let ws = decks();
    ws.tern()
        .args(&["migrate", "--apply"])
        .fails()
        .exit_code(1)
        .stderr_has("pass --yes");

    assert!(ws.applied().is_empty());
    assert!(ws.backups().is_empty());
    assert!(!migrated(&ws, "intro"));
}

#[test]
fn yes_selects_every_item() {
    let ws = decks();
    ws.tern().args(&["migrate", "--apply", "--yes"]).passes();

    assert!(migrated(&ws, "intro"));
    assert!(migrated(&ws, "outro"));
    assert_eq!(ws.applied(), vec!["mark"]);
}

#[test]
fn set_items_limits_the_migration() {
    let ws = decks();
    ws.tern()
        .args(&["migrate", "--apply", "--set", r#"mark.items=["decks/outro"]"#])
        .passes();

    assert!(!migrated(&ws, "intro"));
    assert!(migrated(&ws, "outro"));
}

#[test]
fn unknown_item_fails_and_rolls_back() {
    let ws = decks();
    ws.tern()
        .args(&["migrate", "--apply", "--set", r#"mark.items=["decks/ghost"]"#])
        .fails()
        .exit_code(1)
        .stderr_has("migration 'mark' failed: invalid option 'items'");

    assert!(ws.applied().is_empty());
}

#[test]
fn tool_version_is_bumped_after_success() {
    let ws = decks();
    ws.file(
        ".tern/state.json",
        &ws.read(".tern/state.json").replace(
            &format!("\"toolVersion\": \"{}\"", env!("CARGO_PKG_VERSION")),
            "\"toolVersion\": \"0.0.1\"",
        ),
    );
    assert_eq!(ws.state()["toolVersion"], "0.0.1");

    ws.tern().args(&["migrate", "--apply", "-y"]).passes();
    assert_eq!(ws.state()["toolVersion"], env!("CARGO_PKG_VERSION"));
}
