// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tern backup` - inspect and manage retained backups

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tern_core::{format_age, BackupId, Clock, SystemClock};
use tern_storage::BackupSnapshot;

use super::WorkspaceCtx;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{print_json, write_prune_results, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub command: BackupCommand,
}

#[derive(Subcommand)]
pub enum BackupCommand {
    /// List retained backups, newest first
    List,
    /// Copy a backup's files back into the workspace (the backup is kept)
    Restore {
        /// Backup ID
        id: String,
    },
    /// Delete a backup
    Delete {
        /// Backup ID
        id: String,
    },
    /// Check a backup's files against their recorded checksums
    Verify {
        /// Backup ID
        id: String,
    },
    /// Delete retained backups
    Prune {
        /// Keep this many of the newest backups
        #[arg(long, default_value_t = 0)]
        keep: usize,
        /// Show what would be pruned without doing it
        #[arg(long)]
        dry_run: bool,
    },
}

/// Listing view of a backup; the full file list stays on disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackupSummary {
    pub backup_id: BackupId,
    pub created_at: DateTime<Utc>,
    pub files: usize,
    pub tool_version_at_backup: String,
}

impl From<&BackupSnapshot> for BackupSummary {
    fn from(snapshot: &BackupSnapshot) -> Self {
        Self {
            backup_id: snapshot.backup_id.clone(),
            created_at: snapshot.created_at,
            files: snapshot.files.len(),
            tool_version_at_backup: snapshot.tool_version_at_backup.clone(),
        }
    }
}

pub fn handle(command: BackupCommand, ctx: &WorkspaceCtx, format: OutputFormat) -> Result<()> {
    let backups = ctx.backups();
    match command {
        BackupCommand::List => {
            let summaries: Vec<BackupSummary> =
                backups.list()?.iter().map(BackupSummary::from).collect();
            match format {
                OutputFormat::Text => {
                    if summaries.is_empty() {
                        println!("No backups");
                    } else {
                        write_list(&mut std::io::stdout().lock(), &summaries, SystemClock.now())?;
                    }
                }
                OutputFormat::Json => print_json(&summaries)?,
            }
        }
        BackupCommand::Restore { id } => {
            let id = BackupId::new(id);
            let restored = backups.restore(&id)?;
            match format {
                OutputFormat::Text => {
                    println!("Restored {} file(s) from backup {}", restored, id);
                    println!(
                        "{}",
                        color::muted("Files created after the backup were left in place.")
                    );
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "backupId": id,
                    "restored": restored,
                }))?,
            }
        }
        BackupCommand::Delete { id } => {
            let id = BackupId::new(id);
            let deleted = backups.delete(&id)?;
            match format {
                OutputFormat::Text if deleted => println!("Deleted backup {}", id),
                OutputFormat::Text => println!("Backup {} not found; nothing to delete", id),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "backupId": id,
                    "deleted": deleted,
                }))?,
            }
        }
        BackupCommand::Verify { id } => {
            let id = BackupId::new(id);
            let snapshot = backups.load(&id)?;
            let problems = backups.verify(&id)?;
            match format {
                OutputFormat::Text if problems.is_empty() => {
                    println!(
                        "Backup {} is {} ({} files)",
                        id,
                        color::status("ok"),
                        snapshot.files.len()
                    );
                }
                OutputFormat::Text => {
                    for path in &problems {
                        println!("{} {}", color::status("tampered"), path.display());
                    }
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "backupId": id,
                    "ok": problems.is_empty(),
                    "problems": problems,
                }))?,
            }
            if !problems.is_empty() {
                return Err(ExitError::new(
                    1,
                    format!(
                        "backup {} failed verification: {} file(s) changed or missing",
                        id,
                        problems.len()
                    ),
                )
                .into());
            }
        }
        BackupCommand::Prune { keep, dry_run } => {
            let all = backups.list()?;
            let kept = all.len().min(keep);
            let pruned: Vec<BackupSummary> =
                all.iter().skip(keep).map(BackupSummary::from).collect();
            if !dry_run {
                for summary in &pruned {
                    backups.delete(&summary.backup_id)?;
                }
            }
            write_prune_results(
                &mut std::io::stdout().lock(),
                &pruned,
                kept,
                dry_run,
                format,
                "backup",
                "kept",
                |s| format!("backup {} ({} files)", s.backup_id, s.files),
            )?;
        }
    }
    Ok(())
}

pub(crate) fn write_list(
    out: &mut impl Write,
    summaries: &[BackupSummary],
    now: DateTime<Utc>,
) -> std::io::Result<()> {
    let mut table = Table::new(vec![
        Column::left("ID"),
        Column::left("CREATED"),
        Column::right("FILES"),
        Column::muted("TOOL VERSION"),
    ]);
    for summary in summaries {
        table.row(vec![
            summary.backup_id.to_string(),
            format_age(summary.created_at, now),
            summary.files.to_string(),
            summary.tool_version_at_backup.clone(),
        ]);
    }
    table.render(out)
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
