// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State Store: the single `state.json` document describing a workspace.

use crate::atomic::{read_optional, write_json};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tern_core::{MigrationId, WorkspaceLayout, WorkspaceState};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur in state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access workspace state {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("workspace state {path} is corrupt: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("workspace state already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("workspace has no state document at {0}")]
    NotFound(PathBuf),
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(layout: &WorkspaceLayout) -> Self {
        Self {
            path: layout.state_file(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the state document. Returns `Ok(None)` when it does not exist.
    ///
    /// Unlike the journal, a corrupt state file is an error: it is never
    /// moved aside, since losing the applied list would re-run migrations.
    pub fn load(&self) -> Result<Option<WorkspaceState>, StateError> {
        let Some(bytes) = read_optional(&self.path).map_err(|source| self.io(source))? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StateError::Json {
                path: self.path.clone(),
                source,
            })
    }

    /// Load the state document, failing with [`StateError::NotFound`] if absent.
    pub fn require(&self) -> Result<WorkspaceState, StateError> {
        self.load()?
            .ok_or_else(|| StateError::NotFound(self.path.clone()))
    }

    pub fn save(&self, state: &WorkspaceState) -> Result<(), StateError> {
        write_json(&self.path, state).map_err(|source| self.io(source))
    }

    /// Create a fresh state document. With `force`, an existing one is replaced.
    pub fn init(
        &self,
        tool_version: &str,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<WorkspaceState, StateError> {
        if !force && self.exists() {
            return Err(StateError::AlreadyExists(self.path.clone()));
        }
        let state = WorkspaceState::new(tool_version, now);
        self.save(&state)?;
        debug!(path = %self.path.display(), tool_version, "initialized workspace state");
        Ok(state)
    }

    /// Persist `id` as applied and return the updated state.
    pub fn record_applied(
        &self,
        id: &MigrationId,
        at: DateTime<Utc>,
    ) -> Result<WorkspaceState, StateError> {
        let mut state = self.require()?;
        if state.mark_applied(id, at) {
            self.save(&state)?;
            debug!(migration = %id, "recorded migration as applied");
        }
        Ok(state)
    }

    /// Bump the recorded tool version. Returns `true` if it changed.
    pub fn set_tool_version(&self, version: &str, at: DateTime<Utc>) -> Result<bool, StateError> {
        let mut state = self.require()?;
        let changed = state.set_tool_version(version, at);
        if changed {
            self.save(&state)?;
            debug!(tool_version = version, "updated workspace tool version");
        }
        Ok(changed)
    }

    fn io(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
