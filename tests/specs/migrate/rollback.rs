//! Batch failure: restore, journal, retained backup

use crate::prelude::*;

fn three_step_batch(ws: &Workspace) {
    ws.file("deck.md", "original");
    ws.manifest(&[
        ("m1", "edit deck", &[]),
        ("m2", "breaks", &["m1"]),
        ("m3", "never runs", &["m2"]),
    ]);
    ws.script("m1", &write_step("deck.md", "edited"));
    ws.script("m2", &fail_step("disk full"));
    ws.script("m3", &write_step("m3.txt", "m3"));
}

#[test]
fn failure_restores_the_workspace_and_exits_one() {
    let ws = Workspace::init();
    three_step_batch(&ws);

    let run = ws
        .tern()
        .args(&["migrate", "--apply"])
        .fails()
        .exit_code(1)
        .stderr_has("Error: migration 'm2' failed: disk full; workspace restored from backup; backup preserved as ");
    run.stdout_has("rolled back m1\n").stdout_has("failed      m2\n");

    assert_eq!(ws.read("deck.md"), "original");
    assert!(!ws.exists("m3.txt"));
    assert!(ws.applied().is_empty());
}

#[test]
fn failure_keeps_exactly_one_backup() {
    let ws = Workspace::init();
    three_step_batch(&ws);
    let run = ws.tern().args(&["migrate", "--apply"]).fails();

    let backups = ws.backups();
    assert_eq!(backups.len(), 1);
    assert!(run.stderr().contains(&format!("backup preserved as {}", backups[0])));
}

#[test]
fn failure_is_journaled() {
    let ws = Workspace::init();
    three_step_batch(&ws);
    ws.tern().args(&["migrate", "--apply"]).fails();

    let journal: serde_json::Value =
        serde_json::from_str(&ws.read(".tern/migration-journal.json")).unwrap();
    let entries: Vec<(String, bool, bool)> = journal["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            (
                e["migrationId"].as_str().unwrap().to_string(),
                e["success"].as_bool().unwrap(),
                e["rolledBack"].as_bool().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        entries,
        vec![
            ("m1".to_string(), true, false),
            ("m2".to_string(), false, false),
            ("m1".to_string(), false, true),
        ]
    );
}

#[test]
fn next_apply_warns_about_the_orphaned_backup() {
    let ws = Workspace::init();
    three_step_batch(&ws);
    ws.tern().args(&["migrate", "--apply"]).fails();
    let orphan = ws.backups().remove(0);

    ws.script("m2", &write_step("m2.txt", "fixed"));
    ws.tern()
        .args(&["migrate", "--apply"])
        .passes()
        .stderr_has(&format!(
            "warning: 1 backup(s) from earlier runs still present: {}",
            orphan
        ));

    assert_eq!(ws.applied(), vec!["m1", "m2", "m3"]);
    assert_eq!(ws.backups(), vec![orphan], "older backups are never removed");
}

#[test]
fn files_created_during_the_batch_survive_rollback() {
    let ws = Workspace::init();
    ws.manifest(&[("new", "adds a file", &[]), ("bad", "fails", &["new"])]);
    ws.script("new", &write_step("fresh.txt", "new"));
    ws.script("bad", &fail_step("nope"));

    ws.tern().args(&["migrate", "--apply"]).fails();

    assert!(ws.exists("fresh.txt"));
    assert!(ws.applied().is_empty());
}
