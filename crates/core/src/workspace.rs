// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent workspace metadata: tool version and applied migrations.

use crate::MigrationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A migration recorded as applied to the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMigration {
    pub id: MigrationId,
    pub applied_at: DateTime<Utc>,
}

/// Metadata document stored in `.tern/state.json`.
///
/// `applied_migrations` may name IDs the current manifest no longer knows
/// about (a newer tool wrote them); those are kept untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub tool_version: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub applied_migrations: Vec<AppliedMigration>,
}

impl WorkspaceState {
    pub fn new(tool_version: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            tool_version: tool_version.into(),
            created_at: now,
            last_updated_at: now,
            applied_migrations: Vec::new(),
        }
    }

    pub fn is_applied(&self, id: &str) -> bool {
        self.applied_migrations.iter().any(|m| m.id == id)
    }

    /// Record `id` as applied. Returns `false` (and changes nothing) when
    /// it is already present.
    pub fn mark_applied(&mut self, id: &MigrationId, at: DateTime<Utc>) -> bool {
        if self.is_applied(id.as_str()) {
            return false;
        }
        self.applied_migrations.push(AppliedMigration {
            id: id.clone(),
            applied_at: at,
        });
        self.last_updated_at = at;
        true
    }

    /// Change the recorded tool version. Returns `false` if unchanged.
    pub fn set_tool_version(&mut self, version: &str, at: DateTime<Utc>) -> bool {
        if self.tool_version == version {
            return false;
        }
        self.tool_version = version.to_string();
        self.last_updated_at = at;
        true
    }

    pub fn applied_ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.applied_migrations.iter().map(|m| &m.id)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
