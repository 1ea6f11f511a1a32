// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout of a workspace's hidden `.tern` directory.

use crate::BackupId;
use std::path::{Path, PathBuf};

/// Hidden directory holding all tool metadata, relative to the workspace root.
pub const STATE_DIR: &str = ".tern";

/// File name of the manifest inside the migrations directory.
pub const MANIFEST_FILE: &str = "migrations.json";

/// Metadata document written into every backup directory.
pub const BACKUP_METADATA_FILE: &str = "backup.json";

/// Subdirectory of a backup holding the mirrored workspace files.
pub const BACKUP_FILES_DIR: &str = "files";

/// Paths to everything the migration engine reads or writes in a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.state_dir().join("migrations")
    }

    pub fn journal_file(&self) -> PathBuf {
        self.state_dir().join("migration-journal.json")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.state_dir().join("backups")
    }

    pub fn backup_dir(&self, id: &BackupId) -> PathBuf {
        self.backups_dir().join(id.as_str())
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir().join("config.toml")
    }

    /// Workspace-relative paths the engine owns and never snapshots: the
    /// backups themselves and the journal (which must outlive a restore).
    pub fn internal_exclusions() -> [PathBuf; 2] {
        [
            Path::new(STATE_DIR).join("backups"),
            Path::new(STATE_DIR).join("migration-journal.json"),
        ]
    }
}

/// Find the workspace root by walking up from `start`.
///
/// Returns the nearest ancestor (including `start`) that contains a
/// [`STATE_DIR`] directory.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(STATE_DIR).is_dir())
        .map(Path::to_path_buf)
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
