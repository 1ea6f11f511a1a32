// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Write prune results in text or JSON format.
///
/// - `entity`: singular name shown in the summary, e.g. `"backup"`.
/// - `kept_label`: suffix after the kept count, e.g. `"kept"`.
/// - `format_entry`: text printed after "Pruned" / "Would prune".
#[allow(clippy::too_many_arguments)]
pub fn write_prune_results<T: Serialize>(
    out: &mut impl Write,
    pruned: &[T],
    kept: usize,
    dry_run: bool,
    format: OutputFormat,
    entity: &str,
    kept_label: &str,
    format_entry: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if dry_run {
                writeln!(out, "Dry run: no changes made\n")?;
            }

            let label = if dry_run { "Would prune" } else { "Pruned" };
            for entry in pruned {
                writeln!(out, "{} {}", label, format_entry(entry))?;
            }

            let verb = if dry_run { "would be pruned" } else { "pruned" };
            writeln!(
                out,
                "\n{} {}(s) {}, {} {}",
                pruned.len(),
                entity,
                verb,
                kept,
                kept_label
            )?;
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "dryRun": dry_run,
                "pruned": pruned,
                "kept": kept,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&obj)?)?;
        }
    }
    Ok(())
}
