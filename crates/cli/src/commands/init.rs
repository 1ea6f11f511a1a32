// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tern init` - create workspace state

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tern_core::{Clock, SystemClock, WorkspaceLayout};
use tern_storage::{StateError, StateStore};

use crate::exit_error::ExitError;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct InitArgs {
    /// Replace existing state (forgets every applied migration)
    #[arg(long)]
    pub force: bool,
}

pub fn handle(args: InitArgs, root: &Path, format: OutputFormat) -> Result<()> {
    let layout = WorkspaceLayout::new(root);
    let store = StateStore::new(&layout);
    let version = env!("CARGO_PKG_VERSION");

    let state = match store.init(version, SystemClock.now(), args.force) {
        Ok(state) => state,
        Err(StateError::AlreadyExists(path)) => {
            return Err(ExitError::new(
                1,
                format!(
                    "workspace already initialized at {} (use --force to reset)",
                    path.display()
                ),
            )
            .into());
        }
        Err(e) => return Err(e.into()),
    };
    std::fs::create_dir_all(layout.migrations_dir())?;

    match format {
        OutputFormat::Text => {
            println!(
                "Initialized tern workspace at {} (tool version {})",
                layout.root().display(),
                state.tool_version
            );
        }
        OutputFormat::Json => print_json(&state)?,
    }
    Ok(())
}
