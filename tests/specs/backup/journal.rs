//! `tern journal`

use crate::prelude::*;

fn journaled() -> Workspace {
    let ws = Workspace::init();
    ws.manifest(&[("good", "works", &[]), ("bad", "fails", &["good"])]);
    ws.script("good", &write_step("good.txt", "ok"));
    ws.script("bad", &fail_step("out of ink"));
    ws.tern().args(&["migrate", "--apply"]).fails();
    ws
}

#[test]
fn empty_journal() {
    let ws = Workspace::init();
    ws.tern()
        .args(&["journal"])
        .passes()
        .stdout_eq("No journal entries\n");
}

#[test]
fn journal_lists_every_attempt() {
    let ws = journaled();
    let run = ws.tern().args(&["journal"]).passes();
    let lines: Vec<String> = run.stdout().lines().map(String::from).collect();

    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("MIGRATION"));
    assert!(lines[1].starts_with("good       applied"));
    assert!(lines[2].starts_with("bad        failed"));
    assert!(lines[2].ends_with("out of ink"));
    assert!(lines[3].starts_with("good       rolled back"));
}

#[test]
fn journal_filters_by_id_and_failure() {
    let ws = journaled();

    let by_id = ws.tern().args(&["journal", "--id", "good", "-o", "json"]).passes().json();
    assert_eq!(by_id.as_array().unwrap().len(), 2);

    let failed = ws.tern().args(&["journal", "--failed", "-o", "json"]).passes().json();
    let ids: Vec<&str> = failed
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["migrationId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["bad", "good"]);

    let good_failed = ws
        .tern()
        .args(&["journal", "--id", "good", "--failed", "-o", "json"])
        .passes()
        .json();
    assert_eq!(good_failed[0]["rolledBack"], true);
    assert_eq!(good_failed.as_array().unwrap().len(), 1);
}

#[test]
fn journal_limit_keeps_most_recent() {
    let ws = journaled();
    let last = ws.tern().args(&["journal", "-n", "1", "-o", "json"]).passes().json();
    assert_eq!(last.as_array().unwrap().len(), 1);
    assert_eq!(last[0]["rolledBack"], true);
}
