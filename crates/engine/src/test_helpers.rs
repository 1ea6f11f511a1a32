// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{Migration, MigrationContext, MigrationError, RunOptions};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tern_core::{BackupId, Clock, FakeClock, MigrationId, WorkspaceLayout, WorkspaceState};
use tern_manifest::{Manifest, ManifestEntry};
use tern_storage::{Journal, JournalEntry, StateStore};

/// A temporary workspace with helpers for arranging and inspecting it.
pub(crate) struct TestWorkspace {
    dir: TempDir,
    pub layout: WorkspaceLayout,
    pub clock: FakeClock,
}

impl TestWorkspace {
    /// Workspace with a fresh state document at tool version 1.0.0.
    pub fn new() -> Self {
        let ws = Self::bare();
        StateStore::new(&ws.layout)
            .init("1.0.0", ws.clock.now(), false)
            .unwrap();
        ws
    }

    /// Workspace with no state document.
    pub fn bare() -> Self {
        let dir = tempdir().unwrap();
        let layout = WorkspaceLayout::new(dir.path());
        Self {
            dir,
            layout,
            clock: FakeClock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    pub fn manifest(&self, entries: Vec<ManifestEntry>) {
        let manifest = Manifest::new("1", entries);
        fs::create_dir_all(self.layout.migrations_dir()).unwrap();
        fs::write(
            self.layout.migrations_dir().join("migrations.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();
    }

    pub fn mark_applied(&self, id: &str) {
        StateStore::new(&self.layout)
            .record_applied(&MigrationId::new(id), self.clock.now())
            .unwrap();
    }

    pub fn state(&self) -> Option<WorkspaceState> {
        StateStore::new(&self.layout).load().unwrap()
    }

    pub fn applied_ids(&self) -> Vec<String> {
        self.state()
            .map(|s| s.applied_ids().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        Journal::new(&self.layout).entries().unwrap()
    }

    /// Names of the backup directories on disk.
    pub fn backups(&self) -> Vec<BackupId> {
        let Ok(entries) = fs::read_dir(self.layout.backups_dir()) else {
            return Vec::new();
        };
        let mut ids: Vec<BackupId> = entries
            .map(|e| BackupId::new(e.unwrap().file_name().to_string_lossy()))
            .collect();
        ids.sort();
        ids
    }

    pub fn options(&self, apply: bool) -> RunOptions {
        RunOptions::new(self.root()).apply(apply)
    }
}

/// Records which migration bodies ran, in order.
#[derive(Clone, Default)]
pub(crate) struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn record(&self, id: &str) {
        self.0.lock().push(id.to_string());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }

    /// A body that records its call and does nothing else.
    pub fn noop(&self) -> impl Migration {
        let calls = self.clone();
        move |ctx: &MigrationContext| -> Result<(), MigrationError> {
            calls.record(ctx.migration_id().as_str());
            Ok(())
        }
    }

    /// A body that records its call and writes `contents` to `rel`.
    pub fn writes(&self, rel: &str, contents: &str) -> impl Migration {
        let calls = self.clone();
        let rel = rel.to_string();
        let contents = contents.to_string();
        move |ctx: &MigrationContext| -> Result<(), MigrationError> {
            calls.record(ctx.migration_id().as_str());
            fs::write(ctx.path(&rel), &contents).map_err(|e| MigrationError::msg(e.to_string()))
        }
    }

    /// A body that records its call and fails with `message`.
    pub fn fails(&self, message: &str) -> impl Migration {
        let calls = self.clone();
        let message = message.to_string();
        move |ctx: &MigrationContext| -> Result<(), MigrationError> {
            calls.record(ctx.migration_id().as_str());
            Err(MigrationError::msg(message.clone()))
        }
    }
}
