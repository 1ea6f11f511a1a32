//! `tern backup`

use crate::prelude::*;

/// Workspace with one retained backup from a failed batch.
fn with_failed_batch() -> (Workspace, String) {
    let ws = Workspace::init();
    ws.file("deck.md", "original");
    ws.manifest(&[("edit", "edit", &[]), ("boom", "fails", &["edit"])]);
    ws.script("edit", &write_step("deck.md", "edited"));
    ws.script("boom", &fail_step("boom"));
    ws.tern().args(&["migrate", "--apply"]).fails();
    let id = ws.backups().remove(0);
    (ws, id)
}

#[test]
fn list_without_backups() {
    let ws = Workspace::init();
    ws.tern()
        .args(&["backup", "list"])
        .passes()
        .stdout_eq("No backups\n");
}

#[test]
fn list_shows_retained_backups() {
    let (ws, id) = with_failed_batch();
    ws.tern()
        .args(&["backup", "list"])
        .passes()
        .stdout_has("ID")
        .stdout_has("TOOL VERSION")
        .stdout_has(&id);

    let listed = ws.tern().args(&["backup", "list", "-o", "json"]).passes().json();
    assert_eq!(listed[0]["backupId"], id.as_str());
    assert_eq!(listed[0]["toolVersionAtBackup"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn backups_skip_dependency_caches() {
    let ws = Workspace::init();
    ws.file("node_modules/pkg/index.js", "x");
    ws.file("src/app.ts", "y");
    ws.manifest(&[("boom", "fails", &[])]);
    ws.script("boom", &fail_step("boom"));
    ws.tern().args(&["migrate", "--apply"]).fails();

    let backup = ws.backups().remove(0);
    let meta: serde_json::Value =
        serde_json::from_str(&ws.read(format!(".tern/backups/{}/backup.json", backup))).unwrap();
    let files: Vec<&str> = meta["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_str().unwrap())
        .collect();
    assert!(files.contains(&"src/app.ts"));
    assert!(!files.iter().any(|f| f.starts_with("node_modules")));
}

#[test]
fn config_excludes_extend_the_defaults() {
    let ws = Workspace::init();
    ws.file(".tern/config.toml", "[backup]\nexclude = [\"renders\"]\n");
    ws.file("renders/big.mp4", "video");
    ws.file("deck.md", "deck");
    ws.manifest(&[("boom", "fails", &[])]);
    ws.script("boom", &fail_step("boom"));
    ws.tern().args(&["migrate", "--apply"]).fails();

    let backup = ws.backups().remove(0);
    assert!(ws.exists(format!(".tern/backups/{}/files/deck.md", backup)));
    assert!(!ws.exists(format!(".tern/backups/{}/files/renders", backup)));
}

#[test]
fn restore_copies_files_back() {
    let (ws, id) = with_failed_batch();
    ws.file("deck.md", "changed by hand");

    ws.tern()
        .args(&["backup", "restore", &id])
        .passes()
        .stdout_has(&format!("from backup {}", id));
    assert_eq!(ws.read("deck.md"), "original");
    assert_eq!(ws.backups(), vec![id], "restore keeps the backup");
}

#[test]
fn restore_unknown_backup_fails() {
    let ws = Workspace::init();
    ws.tern()
        .args(&["backup", "restore", "nope"])
        .fails()
        .exit_code(1)
        .stderr_has("nope");
}

#[test]
fn verify_detects_tampering() {
    let (ws, id) = with_failed_batch();
    ws.tern()
        .args(&["backup", "verify", &id])
        .passes()
        .stdout_has("is ok");

    ws.file(format!(".tern/backups/{}/files/deck.md", id), "tampered");
    ws.tern()
        .args(&["backup", "verify", &id])
        .fails()
        .exit_code(1)
        .stdout_has("tampered deck.md")
        .stderr_has("failed verification: 1 file(s) changed or missing");
}

#[test]
fn delete_is_idempotent() {
    let (ws, id) = with_failed_batch();
    ws.tern()
        .args(&["backup", "delete", &id])
        .passes()
        .stdout_eq(&format!("Deleted backup {}\n", id));
    ws.tern()
        .args(&["backup", "delete", &id])
        .passes()
        .stdout_eq(&format!("Backup {} not found; nothing to delete\n", id));
    assert!(ws.backups().is_empty());
}

#[test]
fn delete_rejects_ids_outside_the_backups_dir() {
    let (ws, id) = with_failed_batch();
    for bad in ["..", "../..", "a/b"] {
        ws.tern()
            .args(&["backup", "delete", bad])
            .fails()
            .exit_code(1)
            .stderr_has("invalid backup id");
    }
    assert!(ws.exists(".tern/state.json"));
    assert!(ws.exists("deck.md"));
    assert_eq!(ws.backups(), vec![id]);
}

#[test]
fn prune_dry_run_keeps_everything() {
    let (ws, id) = with_failed_batch();
    ws.tern()
        .args(&["backup", "prune", "--dry-run"])
        .passes()
        .stdout_has("Dry run: no changes made")
        .stdout_has(&format!("Would prune backup {}", id))
        .stdout_has("1 backup(s) would be pruned, 0 kept");
    assert_eq!(ws.backups(), vec![id]);
}

#[test]
fn prune_removes_all_but_keep() {
    let (ws, first) = with_failed_batch();
    ws.tern().args(&["migrate", "--apply"]).fails();
    assert_eq!(ws.backups().len(), 2);

    ws.tern()
        .args(&["backup", "prune", "--keep", "1"])
        .passes()
        .stdout_has(&format!("Pruned backup {}", first))
        .stdout_has("1 backup(s) pruned, 1 kept");
    assert_eq!(ws.backups().len(), 1);
    assert_ne!(ws.backups()[0], first);
}
