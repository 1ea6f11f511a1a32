// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration Runner: computes the pending set and applies it as one batch.
//!
//! A run moves through these phases:
//!
//! ```text
//! ComputingPending ─┬─ nothing pending ──────────────────────────────▶ Done
//!                   └─ Snapshotting ─▶ Executing ─┬─ all ok ─▶ Cleanup ─▶ Done
//!                                                 └─ failure ─▶ RollingBack ─▶ Failed
//! ```
//!
//! One backup covers the whole batch. A failing migration restores it,
//! which also undoes every migration that already succeeded in the batch.

use crate::error::RunError;
use crate::migration::{MigrationContext, MigrationOptions, MigrationRegistry};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use tern_core::layout::MANIFEST_FILE;
use tern_core::{BackupId, Clock, MigrationId, SystemClock, WorkspaceLayout, WorkspaceState};
use tern_manifest::{read_manifest, validate, CircularDependency, Manifest};
use tern_storage::{BackupManager, Journal, JournalEntry, StateStore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    ComputingPending,
    Snapshotting,
    Executing,
    Cleanup,
    RollingBack,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ComputingPending => "computing-pending",
            Self::Snapshotting => "snapshotting",
            Self::Executing => "executing",
            Self::Cleanup => "cleanup",
            Self::RollingBack => "rolling-back",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs to [`Runner::run`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workspace_dir: PathBuf,
    pub migrations_dir: PathBuf,
    /// `false` previews without touching anything.
    pub apply: bool,
    pub migration_options: MigrationOptions,
}

impl RunOptions {
    /// Preview run against the workspace's own migrations directory.
    pub fn new(workspace_dir: impl Into<PathBuf>) -> Self {
        let workspace_dir = workspace_dir.into();
        let migrations_dir = WorkspaceLayout::new(&workspace_dir).migrations_dir();
        Self {
            workspace_dir,
            migrations_dir,
            apply: false,
            migration_options: MigrationOptions::new(),
        }
    }

    pub fn apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    pub fn option(mut self, id: impl Into<MigrationId>, key: &str, value: Value) -> Self {
        self.migration_options
            .entry(id.into())
            .or_default()
            .insert(key.to_string(), value);
        self
    }
}

/// One line of a dry-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunItem {
    pub id: MigrationId,
    pub description: String,
    pub would_apply: bool,
    pub already_applied: bool,
    pub breaking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub id: MigrationId,
    pub success: bool,
    /// Set when a later failure in the same batch undid this migration.
    pub rolled_back: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMigration {
    pub migration_id: MigrationId,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub success: bool,
    pub applied: Vec<MigrationOutcome>,
    /// Already applied before this run.
    pub skipped: Vec<MigrationId>,
    /// Pending at the start of this run, in execution order.
    pub pending: Vec<MigrationId>,
    pub failed: Option<FailedMigration>,
    /// Retained batch backup; only set when the batch failed.
    pub backup_id: Option<BackupId>,
    pub rolled_back: bool,
    /// Backups that existed before this run started.
    pub orphaned_backups: Vec<BackupId>,
}

struct Plan {
    manifest: Manifest,
    order: Vec<MigrationId>,
    state: Option<WorkspaceState>,
}

impl Plan {
    fn is_applied(&self, id: &str) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_applied(id))
    }

    fn pending(&self) -> Vec<MigrationId> {
        self.order
            .iter()
            .filter(|id| !self.is_applied(id.as_str()))
            .cloned()
            .collect()
    }

    fn skipped(&self) -> Vec<MigrationId> {
        self.order
            .iter()
            .filter(|id| self.is_applied(id.as_str()))
            .cloned()
            .collect()
    }
}

pub struct Runner<'r, C: Clock = SystemClock> {
    registry: &'r MigrationRegistry,
    clock: C,
    excludes: Vec<PathBuf>,
}

impl<'r> Runner<'r, SystemClock> {
    pub fn new(registry: &'r MigrationRegistry) -> Self {
        Self {
            registry,
            clock: SystemClock,
            excludes: Vec::new(),
        }
    }
}

impl<'r, C: Clock> Runner<'r, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Runner<'r, C2> {
        Runner {
            registry: self.registry,
            clock,
            excludes: self.excludes,
        }
    }

    /// Extra backup exclusion prefixes (on top of the defaults).
    pub fn with_excludes(mut self, excludes: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excludes.extend(excludes);
        self
    }

    /// Report what an apply would do. Reads only.
    pub fn dry_run(
        &self,
        workspace_dir: &Path,
        migrations_dir: &Path,
    ) -> Result<Vec<DryRunItem>, RunError> {
        let plan = self.plan(&WorkspaceLayout::new(workspace_dir), migrations_dir)?;
        let items = plan
            .order
            .iter()
            .filter_map(|id| plan.manifest.get(id.as_str()))
            .map(|entry| {
                let already_applied = plan.is_applied(entry.id.as_str());
                DryRunItem {
                    id: entry.id.clone(),
                    description: entry.description.clone(),
                    would_apply: !already_applied,
                    already_applied,
                    breaking: entry.breaking,
                }
            })
            .collect();
        Ok(items)
    }

    pub fn run(&self, options: &RunOptions) -> Result<RunResult, RunError> {
        let layout = WorkspaceLayout::new(&options.workspace_dir);
        let plan = self.plan(&layout, &options.migrations_dir)?;
        let pending = plan.pending();
        let skipped = plan.skipped();

        if !options.apply {
            debug!(pending = pending.len(), skipped = skipped.len(), "preview only");
            return Ok(RunResult {
                success: true,
                skipped,
                pending,
                ..RunResult::default()
            });
        }

        let store = StateStore::new(&layout);
        let Some(mut state) = plan.state else {
            return Err(RunError::StateMissing(store.path().to_owned()));
        };
        if let Some(missing) = pending.iter().find(|id| !self.registry.contains(id.as_str())) {
            return Err(RunError::MigrationImplementationMissing(missing.clone()));
        }
        if pending.is_empty() {
            debug!(phase = %Phase::Done, "nothing pending");
            return Ok(RunResult {
                success: true,
                skipped,
                ..RunResult::default()
            });
        }

        let backups = BackupManager::new(layout.clone())
            .with_clock(self.clock.clone())
            .with_excludes(&self.excludes);
        let orphaned_backups: Vec<BackupId> = backups
            .list()?
            .into_iter()
            .map(|snapshot| snapshot.backup_id)
            .collect();
        if !orphaned_backups.is_empty() {
            warn!(
                count = orphaned_backups.len(),
                backups = ?orphaned_backups,
                "found backups from earlier runs; leaving them in place",
            );
        }

        debug!(phase = %Phase::Snapshotting, pending = pending.len(), "snapshotting workspace");
        let backup_id = backups.create()?;
        let journal = Journal::new(&layout);
        let pre_batch = state.clone();

        debug!(phase = %Phase::Executing, backup = %backup_id, "executing batch");
        let mut applied: Vec<MigrationOutcome> = Vec::with_capacity(pending.len());
        for id in &pending {
            let body = self
                .registry
                .get(id.as_str())
                .ok_or_else(|| RunError::MigrationImplementationMissing(id.clone()))?;
            let ctx = MigrationContext::new(
                id.clone(),
                &options.workspace_dir,
                state.clone(),
                Some(backup_id.clone()),
                options
                    .migration_options
                    .get(id)
                    .cloned()
                    .unwrap_or_else(Map::new),
            );

            debug!(migration = %id, "running migration");
            match body.up(&ctx) {
                Ok(()) => {
                    let now = self.clock.now();
                    state = store.record_applied(id, now)?;
                    journal.add(JournalEntry::succeeded(
                        id.clone(),
                        now,
                        Some(backup_id.clone()),
                    ))?;
                    info!(migration = %id, "applied migration");
                    applied.push(MigrationOutcome {
                        id: id.clone(),
                        success: true,
                        rolled_back: false,
                        error: None,
                    });
                }
                Err(e) => {
                    let error = e.to_string();
                    warn!(migration = %id, error = %error, "migration failed, rolling back batch");
                    let failure = JournalEntry::failed(
                        id.clone(),
                        self.clock.now(),
                        Some(backup_id.clone()),
                        error.clone(),
                    );
                    self.roll_back(
                        &backups,
                        &backup_id,
                        &store,
                        &pre_batch,
                        &journal,
                        failure,
                        &mut applied,
                    )?;
                    applied.push(MigrationOutcome {
                        id: id.clone(),
                        success: false,
                        rolled_back: false,
                        error: Some(error.clone()),
                    });
                    return Ok(RunResult {
                        success: false,
                        applied,
                        skipped,
                        pending: pending.clone(),
                        failed: Some(FailedMigration {
                            migration_id: id.clone(),
                            error,
                        }),
                        backup_id: Some(backup_id),
                        rolled_back: true,
                        orphaned_backups,
                    });
                }
            }
        }

        debug!(phase = %Phase::Cleanup, backup = %backup_id, "removing batch backup");
        backups.delete(&backup_id)?;
        debug!(phase = %Phase::Done, applied = applied.len(), "batch complete");

        Ok(RunResult {
            success: true,
            applied,
            skipped,
            pending,
            failed: None,
            backup_id: None,
            rolled_back: false,
            orphaned_backups,
        })
    }

    fn plan(&self, layout: &WorkspaceLayout, migrations_dir: &Path) -> Result<Plan, RunError> {
        debug!(
            phase = %Phase::ComputingPending,
            workspace = %layout.root().display(),
            "computing pending migrations",
        );
        let manifest = read_manifest(migrations_dir)?
            .ok_or_else(|| RunError::ManifestMissing(migrations_dir.join(MANIFEST_FILE)))?;

        let issues = validate(&manifest);
        if !issues.is_empty() {
            return Err(RunError::ManifestInvalid(
                issues.iter().map(ToString::to_string).collect(),
            ));
        }

        let order = tern_manifest::order(&manifest)
            .map_err(|CircularDependency(id)| RunError::CircularDependency(id))?;
        let state = StateStore::new(layout).load()?;

        Ok(Plan {
            manifest,
            order,
            state,
        })
    }

    /// Restore the batch backup, then journal the failure and every earlier
    /// migration of the batch as rolled back.
    ///
    /// The workspace and state are restored before any journal write, so a
    /// journal error never leaves the batch half-applied.
    #[allow(clippy::too_many_arguments)]
    fn roll_back(
        &self,
        backups: &BackupManager<C>,
        backup_id: &BackupId,
        store: &StateStore,
        pre_batch: &WorkspaceState,
        journal: &Journal,
        failure: JournalEntry,
        applied: &mut [MigrationOutcome],
    ) -> Result<(), RunError> {
        debug!(phase = %Phase::RollingBack, backup = %backup_id, "restoring workspace");
        backups.restore(backup_id)?;
        // state.json may be excluded by config; never leave this batch's ids in it
        store.save(pre_batch)?;
        for outcome in applied.iter_mut() {
            outcome.rolled_back = true;
        }
        warn!(
            phase = %Phase::Failed,
            backup = %backup_id,
            "workspace restored from backup; backup preserved as {}",
            backup_id,
        );

        journal.add(failure)?;
        let now = self.clock.now();
        for outcome in applied.iter() {
            journal.add(JournalEntry::rolled_back(
                outcome.id.clone(),
                now,
                Some(backup_id.clone()),
            ))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
