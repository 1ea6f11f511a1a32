//! Error reporting and exit codes outside of migration runs.

use crate::prelude::*;

#[test]
fn commands_outside_a_workspace_fail() {
    let dir = Workspace::empty();
    dir.tern()
        .args(&["status"])
        .fails()
        .exit_code(1)
        .stderr_has("Error: not inside a tern workspace (run `tern init` first)");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    cli().args(&["frobnicate"]).fails().exit_code(2);
}

#[test]
fn workspace_override_is_honored() {
    let ws = Workspace::init();
    let elsewhere = Workspace::empty();
    elsewhere
        .tern()
        .env("TERN_WORKSPACE", ws.path())
        .args(&["status"])
        .passes()
        .stdout_has("Applied: 0");
}

#[test]
fn nested_directories_find_the_workspace() {
    let ws = Workspace::init();
    ws.file("decks/intro/slides.md", "# hi");
    cli()
        .pwd(ws.path().join("decks/intro"))
        .args(&["status"])
        .passes()
        .stdout_has("Applied: 0");
}

#[test]
fn broken_config_is_reported() {
    let ws = Workspace::init();
    ws.file(".tern/config.toml", "[backup]\nexclude = 3\n");
    ws.tern()
        .args(&["status"])
        .fails()
        .stderr_has("invalid config");
}
