// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log of migration attempts.
//!
//! The journal is an attempt log, not a record of current state: a rollback
//! adds a new entry rather than editing the one it undoes. It lives outside
//! backups so that restoring a snapshot never erases history.

use crate::atomic::{read_optional, rotate_bak_path, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tern_core::{BackupId, MigrationId, WorkspaceLayout};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("failed to access journal {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One migration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub migration_id: MigrationId,
    pub applied_at: DateTime<Utc>,
    pub backup_id: Option<BackupId>,
    pub success: bool,
    #[serde(default)]
    pub rolled_back: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JournalEntry {
    pub fn succeeded(id: MigrationId, at: DateTime<Utc>, backup_id: Option<BackupId>) -> Self {
        Self {
            migration_id: id,
            applied_at: at,
            backup_id,
            success: true,
            rolled_back: false,
            error: None,
        }
    }

    pub fn failed(
        id: MigrationId,
        at: DateTime<Utc>,
        backup_id: Option<BackupId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            migration_id: id,
            applied_at: at,
            backup_id,
            success: false,
            rolled_back: false,
            error: Some(error.into()),
        }
    }

    /// Marks a migration whose effects were undone by a batch restore.
    pub fn rolled_back(id: MigrationId, at: DateTime<Utc>, backup_id: Option<BackupId>) -> Self {
        Self {
            migration_id: id,
            applied_at: at,
            backup_id,
            success: false,
            rolled_back: true,
            error: None,
        }
    }

    pub fn is_effective_success(&self) -> bool {
        self.success && !self.rolled_back
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JournalFile {
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(layout: &WorkspaceLayout) -> Self {
        Self::at(layout.journal_file())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`, rewriting the whole file.
    pub fn add(&self, entry: JournalEntry) -> Result<(), JournalError> {
        let mut file = self.read()?;
        file.entries.push(entry);
        write_json(&self.path, &file).map_err(|source| self.io(source))
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self.read()?.entries)
    }

    /// Most recent entry that succeeded and was not rolled back.
    pub fn last_successful(&self) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self
            .entries()?
            .into_iter()
            .rev()
            .find(JournalEntry::is_effective_success))
    }

    pub fn history(&self, id: &str) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.migration_id == *id)
            .collect())
    }

    /// Whether the latest entry for `id` is a success that was not rolled back.
    pub fn was_successful(&self, id: &str) -> Result<bool, JournalError> {
        Ok(self
            .history(id)?
            .last()
            .is_some_and(JournalEntry::is_effective_success))
    }

    pub fn failed_or_rolled_back(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| !e.success || e.rolled_back)
            .collect())
    }

    /// Read the journal. A missing file is empty; a corrupt one is moved to
    /// `.bak` and the journal starts over.
    fn read(&self) -> Result<JournalFile, JournalError> {
        let Some(bytes) = read_optional(&self.path).map_err(|source| self.io(source))? else {
            return Ok(JournalFile::default());
        };
        match serde_json::from_slice(&bytes) {
            Ok(file) => Ok(file),
            Err(e) => {
                let bak_path = rotate_bak_path(&self.path);
                warn!(
                    error = %e,
                    path = %self.path.display(),
                    bak = %bak_path.display(),
                    "Corrupt journal, moving to .bak and starting fresh",
                );
                fs::rename(&self.path, &bak_path).map_err(|source| self.io(source))?;
                Ok(JournalFile::default())
            }
        }
    }

    fn io(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
