// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tern - workspace migration CLI

mod color;
mod commands;
mod env;
mod exit_error;
mod output;
mod table;

use output::OutputFormat;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{backup, init, journal, migrate, status};

#[derive(Parser)]
#[command(
    name = "tern",
    version,
    about = "Tern - versioned migrations for content workspaces",
    after_help = "Only one `tern migrate --apply` may run against a workspace at a time."
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create workspace state in the current directory
    Init(init::InitArgs),
    /// Show workspace version, applied and pending migrations
    Status,
    /// Preview or apply pending migrations
    Migrate(migrate::MigrateArgs),
    /// Inspect and manage retained backups
    Backup(backup::BackupArgs),
    /// Show the migration journal
    Journal(journal::JournalArgs),
}

pub(crate) fn cli_command() -> clap::Command {
    Cli::command().styles(color::styles())
}

fn main() {
    if let Err(e) = run() {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain to avoid noisy duplicate output (common when
/// thiserror variants use `#[error("... {0}")]` with `#[from]`).
/// Otherwise we render the full chain so context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

/// Install a stderr subscriber filtered by `TERN_LOG` (default `warn`).
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(color::should_colorize()),
        )
        .try_init();
}

fn run() -> Result<()> {
    let matches = cli_command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let format = cli.output;

    let Some(command) = cli.command else {
        cli_command().print_help()?;
        println!();
        return Ok(());
    };

    setup_logging();

    match command {
        // init creates the workspace, so it never searches for one
        Commands::Init(args) => init::handle(args, &commands::init_root()?, format),
        Commands::Status => status::handle(&commands::WorkspaceCtx::locate()?, format),
        Commands::Migrate(args) => migrate::handle(args, &commands::WorkspaceCtx::locate()?, format),
        Commands::Backup(args) => {
            backup::handle(args.command, &commands::WorkspaceCtx::locate()?, format)
        }
        Commands::Journal(args) => journal::handle(args, &commands::WorkspaceCtx::locate()?, format),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
