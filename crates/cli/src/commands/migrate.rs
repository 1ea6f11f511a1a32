// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tern migrate` - preview or apply pending migrations

use std::io::{IsTerminal, Write};

use anyhow::Result;
use clap::Args;
use dialoguer::theme::ColorfulTheme;
use dialoguer::MultiSelect;
use serde_json::Value;
use tern_core::{Clock, MigrationId, SystemClock};
use tern_engine::{
    AffectedItem, DryRunItem, MigrationOptions, MigrationRegistry, RunOptions, RunResult,
    ITEMS_OPTION,
};

use super::WorkspaceCtx;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct MigrateArgs {
    /// Apply pending migrations (default: preview only)
    #[arg(long)]
    pub apply: bool,

    /// Select every affected item without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Per-migration option; VALUE is JSON, or a plain string if it isn't
    #[arg(long = "set", value_name = "ID.KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<MigrationOption>,
}

/// One `--set` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOption {
    pub id: MigrationId,
    pub key: String,
    pub value: Value,
}

pub(crate) fn parse_option(raw: &str) -> Result<MigrationOption, String> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID.KEY=VALUE, got '{}'", raw))?;
    let (id, key) = target
        .rsplit_once('.')
        .ok_or_else(|| format!("expected ID.KEY before '=', got '{}'", target))?;
    if id.is_empty() || key.is_empty() {
        return Err(format!("migration id and key must be non-empty in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok(MigrationOption {
        id: MigrationId::new(id),
        key: key.to_string(),
        value,
    })
}

pub fn handle(args: MigrateArgs, ctx: &WorkspaceCtx, format: OutputFormat) -> Result<()> {
    let registry = ctx.registry()?;
    let runner = ctx.runner(&registry);
    let root = ctx.layout.root();
    let preview = runner.dry_run(root, &ctx.layout.migrations_dir())?;

    if !args.apply {
        match format {
            OutputFormat::Text => write_preview(&mut std::io::stdout().lock(), &preview)?,
            OutputFormat::Json => print_json(&preview)?,
        }
        return Ok(());
    }

    let mut options = MigrationOptions::new();
    for opt in args.options {
        options.entry(opt.id).or_default().insert(opt.key, opt.value);
    }

    let pending: Vec<MigrationId> = preview
        .into_iter()
        .filter(|item| item.would_apply)
        .map(|item| item.id)
        .collect();
    let candidates = selection_candidates(&registry, &pending, &options, root)?;
    if !candidates.is_empty() && !args.yes {
        if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
            return Err(ExitError::new(
                1,
                "choosing affected items needs a terminal; pass --yes to select all of them",
            )
            .into());
        }
        let chosen = choose_items(&mut options, candidates, prompt_items)?;
        if !chosen {
            return Err(ExitError::new(1, "migration cancelled; nothing was changed").into());
        }
    }

    let mut run_options = RunOptions::new(root);
    run_options.migration_options = options;
    let result = runner.run(&run_options.apply(true))?;

    if !result.orphaned_backups.is_empty() {
        let ids: Vec<&str> = result.orphaned_backups.iter().map(|id| id.as_str()).collect();
        eprintln!(
            "{} {} backup(s) from earlier runs still present: {} (see `tern backup list`)",
            color::yellow("warning:"),
            ids.len(),
            ids.join(", ")
        );
    }

    if result.success {
        ctx.store()
            .set_tool_version(env!("CARGO_PKG_VERSION"), SystemClock.now())?;
    }

    match format {
        OutputFormat::Text => write_result(&mut std::io::stdout().lock(), &result)?,
        OutputFormat::Json => print_json(&result)?,
    }

    match (&result.failed, &result.backup_id) {
        (Some(failed), Some(backup_id)) => Err(ExitError::new(
            1,
            format!(
                "migration '{}' failed: {}; workspace restored from backup; backup preserved as {}",
                failed.migration_id, failed.error, backup_id
            ),
        )
        .into()),
        (Some(failed), None) => Err(ExitError::new(
            1,
            format!("migration '{}' failed: {}", failed.migration_id, failed.error),
        )
        .into()),
        (None, _) => Ok(()),
    }
}

/// Pending migrations that expose affected items and have no `items` option.
pub(crate) fn selection_candidates(
    registry: &MigrationRegistry,
    pending: &[MigrationId],
    options: &MigrationOptions,
    root: &std::path::Path,
) -> Result<Vec<(MigrationId, Vec<AffectedItem>)>> {
    let mut candidates = Vec::new();
    for id in pending {
        let preset = options
            .get(id)
            .is_some_and(|opts| opts.contains_key(ITEMS_OPTION));
        let Some(body) = registry.get(id.as_str()) else {
            continue;
        };
        if preset {
            continue;
        }
        match body.affected_items(root)? {
            Some(items) if !items.is_empty() => candidates.push((id.clone(), items)),
            _ => {}
        }
    }
    Ok(candidates)
}

/// Ask for a selection per candidate and record it as the `items` option.
///
/// Returns `false` as soon as one prompt is cancelled.
pub(crate) fn choose_items(
    options: &mut MigrationOptions,
    candidates: Vec<(MigrationId, Vec<AffectedItem>)>,
    mut prompt: impl FnMut(&MigrationId, &[AffectedItem]) -> Result<Option<Vec<usize>>>,
) -> Result<bool> {
    for (id, items) in candidates {
        let Some(picked) = prompt(&id, &items)? else {
            return Ok(false);
        };
        let names: Vec<Value> = picked
            .into_iter()
            .filter_map(|i| items.get(i))
            .map(|item| Value::String(item.name.clone()))
            .collect();
        options
            .entry(id)
            .or_default()
            .insert(ITEMS_OPTION.to_string(), Value::Array(names));
    }
    Ok(true)
}

fn prompt_items(id: &MigrationId, items: &[AffectedItem]) -> Result<Option<Vec<usize>>> {
    let labels: Vec<String> = items
        .iter()
        .map(|item| format!("{} ({})", item.name, item.current_version))
        .collect();
    let defaults = vec![true; labels.len()];
    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Select items for migration {} (Esc to cancel)", id))
        .items(&labels)
        .defaults(&defaults)
        .interact_opt()?;
    Ok(picked)
}

pub(crate) fn write_preview(out: &mut impl Write, items: &[DryRunItem]) -> Result<()> {
    let pending: Vec<&DryRunItem> = items.iter().filter(|item| item.would_apply).collect();
    let applied: Vec<&DryRunItem> = items.iter().filter(|item| item.already_applied).collect();

    if pending.is_empty() {
        writeln!(out, "Nothing to migrate; workspace is up to date")?;
    } else {
        writeln!(out, "{}", color::header(&format!("Pending ({}):", pending.len())))?;
        let width = pending.iter().map(|item| item.id.as_str().len()).max().unwrap_or(0);
        for item in &pending {
            let marker = if item.breaking {
                format!("  {}", color::status("breaking"))
            } else {
                String::new()
            };
            writeln!(
                out,
                "  {:<width$}  {}{}",
                item.id.as_str(),
                item.description,
                marker
            )?;
        }
    }
    if !applied.is_empty() {
        writeln!(out, "{}", color::header(&format!("Applied ({}):", applied.len())))?;
        for item in &applied {
            writeln!(out, "  {}", color::muted(item.id.as_str()))?;
        }
    }
    if !pending.is_empty() {
        writeln!(out, "\nRun `tern migrate --apply` to apply.")?;
    }
    Ok(())
}

pub(crate) fn write_result(out: &mut impl Write, result: &RunResult) -> Result<()> {
    if result.pending.is_empty() {
        writeln!(out, "Nothing to migrate; workspace is up to date")?;
        return Ok(());
    }
    for outcome in &result.applied {
        let label = if outcome.rolled_back {
            "rolled back"
        } else if outcome.success {
            "applied"
        } else {
            "failed"
        };
        writeln!(out, "{} {}", color::status(&format!("{:<11}", label)), outcome.id)?;
    }
    if result.success {
        writeln!(out, "\nApplied {} migration(s)", result.applied.len())?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
