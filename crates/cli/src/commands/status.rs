// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tern status` - workspace overview

use anyhow::Result;
use serde::Serialize;
use tern_core::{BackupId, MigrationId};
use tern_engine::RunError;

use super::WorkspaceCtx;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    workspace_dir: String,
    tool_version: String,
    binary_version: &'static str,
    applied: usize,
    /// `None` when there is no manifest yet.
    pending: Option<Vec<MigrationId>>,
    retained_backups: Vec<BackupId>,
}

pub fn handle(ctx: &WorkspaceCtx, format: OutputFormat) -> Result<()> {
    let Some(state) = ctx.store().load()? else {
        return Err(ExitError::new(
            1,
            format!(
                "workspace state not found at {} (run `tern init`)",
                ctx.store().path().display()
            ),
        )
        .into());
    };

    let registry = ctx.registry()?;
    let pending = match ctx
        .runner(&registry)
        .dry_run(ctx.layout.root(), &ctx.layout.migrations_dir())
    {
        Ok(items) => Some(
            items
                .into_iter()
                .filter(|item| item.would_apply)
                .map(|item| item.id)
                .collect::<Vec<_>>(),
        ),
        Err(RunError::ManifestMissing(_)) => None,
        Err(e) => return Err(e.into()),
    };
    let retained_backups = ctx
        .backups()
        .list()?
        .into_iter()
        .map(|snapshot| snapshot.backup_id)
        .collect::<Vec<_>>();

    let report = StatusReport {
        workspace_dir: ctx.layout.root().display().to_string(),
        tool_version: state.tool_version.clone(),
        binary_version: env!("CARGO_PKG_VERSION"),
        applied: state.applied_migrations.len(),
        pending,
        retained_backups,
    };

    match format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

fn print_text(report: &StatusReport) {
    println!("{} {}", color::header("Workspace:"), report.workspace_dir);
    println!(
        "{} {} {}",
        color::header("Tool version:"),
        report.tool_version,
        color::muted(&format!("(binary {})", report.binary_version))
    );
    println!("{} {}", color::header("Applied:"), report.applied);
    match &report.pending {
        Some(pending) if pending.is_empty() => {
            println!("{} 0 (up to date)", color::header("Pending:"))
        }
        Some(pending) => {
            println!("{} {}", color::header("Pending:"), pending.len());
            for id in pending {
                println!("  {}", color::status(&format!("pending {}", id)));
            }
        }
        None => println!("{} {}", color::header("Pending:"), color::muted("no manifest")),
    }
    if !report.retained_backups.is_empty() {
        println!(
            "{} {} retained {}",
            color::header("Backups:"),
            report.retained_backups.len(),
            color::muted("(see `tern backup list`)")
        );
    }
}
