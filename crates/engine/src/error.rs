// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the migration runner

use std::path::PathBuf;
use tern_core::MigrationId;
use tern_manifest::ManifestError;
use tern_storage::{BackupError, JournalError, StateError};
use thiserror::Error;

/// Errors that stop a run.
///
/// Everything except the wrapped storage errors is raised before the
/// workspace is touched. Failures inside a migration body are not errors
/// here; they are reported in the run result.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no migration manifest found at {0}")]
    ManifestMissing(PathBuf),
    #[error("migration manifest is invalid:\n{}", render_messages(.0))]
    ManifestInvalid(Vec<String>),
    #[error("failed to read migration manifest: {0}")]
    ManifestUnreadable(#[source] ManifestError),
    #[error("circular dependency detected at migration '{0}'")]
    CircularDependency(MigrationId),
    #[error("workspace state not found at {0}")]
    StateMissing(PathBuf),
    #[error("no implementation registered for migration '{0}'")]
    MigrationImplementationMissing(MigrationId),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Backup(#[from] BackupError),
}

fn render_messages(messages: &[String]) -> String {
    messages
        .iter()
        .map(|m| format!("  - {}", m))
        .collect::<Vec<_>>()
        .join("\n")
}

impl From<ManifestError> for RunError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Shape(issues) => {
                Self::ManifestInvalid(issues.iter().map(ToString::to_string).collect())
            }
            ManifestError::Json { source, .. } => Self::ManifestInvalid(vec![source.to_string()]),
            err @ ManifestError::Io { .. } => Self::ManifestUnreadable(err),
        }
    }
}
