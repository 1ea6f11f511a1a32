// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod backup;
pub mod init;
pub mod journal;
pub mod migrate;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tern_core::{find_workspace_root, WorkspaceConfig, WorkspaceLayout};
use tern_engine::{registry_from_scripts, MigrationRegistry, Runner};
use tern_manifest::{load_scripts, read_manifest};
use tern_storage::{BackupManager, Journal, StateStore};

use crate::exit_error::ExitError;

/// Directory `tern init` creates state in: `TERN_WORKSPACE` or the cwd.
pub fn init_root() -> Result<PathBuf> {
    match crate::env::workspace_dir() {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("failed to read current directory"),
    }
}

/// A located workspace plus its configuration.
pub struct WorkspaceCtx {
    pub layout: WorkspaceLayout,
    pub config: WorkspaceConfig,
}

impl WorkspaceCtx {
    /// Find the workspace from `TERN_WORKSPACE` or the nearest ancestor of
    /// the cwd holding a `.tern` directory.
    pub fn locate() -> Result<Self> {
        let root = match crate::env::workspace_dir() {
            Some(dir) => dir,
            None => {
                let cwd = std::env::current_dir().context("failed to read current directory")?;
                find_workspace_root(&cwd).ok_or_else(|| {
                    ExitError::new(1, "not inside a tern workspace (run `tern init` first)")
                })?
            }
        };
        Self::open(root)
    }

    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = WorkspaceLayout::new(root);
        let config = WorkspaceConfig::load(&layout.config_file())?;
        Ok(Self { layout, config })
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.layout)
    }

    pub fn journal(&self) -> Journal {
        Journal::new(&self.layout)
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::new(self.layout.clone()).with_excludes(&self.config.backup.exclude)
    }

    pub fn runner<'r>(&self, registry: &'r MigrationRegistry) -> Runner<'r> {
        Runner::new(registry).with_excludes(self.config.backup.exclude.iter().cloned())
    }

    /// Registry of scripted bodies for every manifest entry with a script.
    ///
    /// A missing or broken manifest yields an empty registry; the runner
    /// reports manifest problems with full detail.
    pub fn registry(&self) -> Result<MigrationRegistry> {
        let dir = self.layout.migrations_dir();
        let Ok(Some(manifest)) = read_manifest(&dir) else {
            return Ok(MigrationRegistry::new());
        };
        let scripts = load_scripts(&dir, &manifest)?;
        Ok(registry_from_scripts(scripts))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
