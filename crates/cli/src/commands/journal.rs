// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tern journal` - migration attempt history

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use tern_core::{format_age, Clock, SystemClock};
use tern_storage::JournalEntry;

use super::WorkspaceCtx;
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct JournalArgs {
    /// Only entries for this migration
    #[arg(long)]
    pub id: Option<String>,

    /// Only failed and rolled-back entries
    #[arg(long)]
    pub failed: bool,

    /// Show at most this many of the most recent entries
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

pub fn handle(args: JournalArgs, ctx: &WorkspaceCtx, format: OutputFormat) -> Result<()> {
    let journal = ctx.journal();
    let mut entries = match (&args.id, args.failed) {
        (Some(id), _) => journal.history(id)?,
        (None, true) => journal.failed_or_rolled_back()?,
        (None, false) => journal.entries()?,
    };
    if args.id.is_some() && args.failed {
        entries.retain(|entry| !entry.is_effective_success());
    }
    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }

    match format {
        OutputFormat::Text if entries.is_empty() => println!("No journal entries"),
        OutputFormat::Text => {
            write_entries(&mut std::io::stdout().lock(), &entries, SystemClock.now())?
        }
        OutputFormat::Json => print_json(&entries)?,
    }
    Ok(())
}

fn outcome(entry: &JournalEntry) -> &'static str {
    if entry.rolled_back {
        "rolled back"
    } else if entry.success {
        "applied"
    } else {
        "failed"
    }
}

pub(crate) fn write_entries(
    out: &mut impl Write,
    entries: &[JournalEntry],
    now: DateTime<Utc>,
) -> std::io::Result<()> {
    let mut table = Table::new(vec![
        Column::left("MIGRATION"),
        Column::status("STATUS"),
        Column::muted("WHEN"),
        Column::muted("BACKUP"),
        Column::left("ERROR").with_max(60),
    ]);
    for entry in entries {
        table.row(vec![
            entry.migration_id.to_string(),
            outcome(entry).to_string(),
            format_age(entry.applied_at, now),
            entry
                .backup_id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            entry.error.clone().unwrap_or_default(),
        ]);
    }
    table.render(out)
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
