// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The migration body interface and the registry of bodies.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tern_core::{BackupId, MigrationId, WorkspaceState};
use tern_manifest::ScriptError;
use thiserror::Error;

/// Per-migration choices collected before a run (e.g. by an interactive
/// prompt), keyed by migration id.
pub type MigrationOptions = HashMap<MigrationId, Map<String, Value>>;

/// Errors returned by migration bodies
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{0}")]
    Failed(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid option '{key}': {message}")]
    InvalidOption { key: String, message: String },
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl MigrationError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// Something a migration touches that the operator may choose to include
/// or skip (for example one presentation folder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedItem {
    pub name: String,
    pub current_version: String,
}

/// What a migration body sees while it runs.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    migration_id: MigrationId,
    workspace_dir: PathBuf,
    state: WorkspaceState,
    backup_id: Option<BackupId>,
    options: Map<String, Value>,
}

impl MigrationContext {
    pub fn new(
        migration_id: MigrationId,
        workspace_dir: impl Into<PathBuf>,
        state: WorkspaceState,
        backup_id: Option<BackupId>,
        options: Map<String, Value>,
    ) -> Self {
        Self {
            migration_id,
            workspace_dir: workspace_dir.into(),
            state,
            backup_id,
            options,
        }
    }

    pub fn migration_id(&self) -> &MigrationId {
        &self.migration_id
    }

    pub fn workspace_dir(&self) -> &Path {
        &self.workspace_dir
    }

    /// Workspace state as of the start of this migration.
    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    /// Backup covering the current batch.
    pub fn backup_id(&self) -> Option<&BackupId> {
        self.backup_id.as_ref()
    }

    /// Options supplied for this migration; empty when none were given.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Resolve a workspace-relative path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.workspace_dir.join(rel)
    }
}

/// A unit of file-mutation logic. Rollback is by workspace snapshot, so
/// there is no `down`.
pub trait Migration: Send + Sync {
    fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError>;

    /// Items this migration would touch, for pre-flight selection.
    /// `None` means the migration has no such notion.
    fn affected_items(
        &self,
        _workspace_dir: &Path,
    ) -> Result<Option<Vec<AffectedItem>>, MigrationError> {
        Ok(None)
    }
}

impl<F> Migration for F
where
    F: Fn(&MigrationContext) -> Result<(), MigrationError> + Send + Sync,
{
    fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        self(ctx)
    }
}

/// Explicit id → body mapping, built once at startup.
#[derive(Default)]
pub struct MigrationRegistry {
    bodies: IndexMap<MigrationId, Box<dyn Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body, replacing any previous one for `id`.
    pub fn register(&mut self, id: impl Into<MigrationId>, migration: impl Migration + 'static) {
        self.bodies.insert(id.into(), Box::new(migration));
    }

    pub fn with(mut self, id: impl Into<MigrationId>, migration: impl Migration + 'static) -> Self {
        self.register(id, migration);
        self
    }

    pub fn get(&self, id: &str) -> Option<&dyn Migration> {
        self.bodies.get(id).map(|body| &**body)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.bodies.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.bodies.keys()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl std::fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.bodies.keys()).finish()
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
