// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative migration bodies (`.tern/migrations/<id>.json`).
//!
//! A script is a list of file operations run against the workspace, plus
//! an optional `affects` query naming the items (e.g. presentation folders)
//! the migration touches. Steps whose paths contain [`ITEM_PLACEHOLDER`]
//! run once per selected item.

use crate::Manifest;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use tern_core::MigrationId;
use thiserror::Error;
use tracing::debug;

/// Replaced by an affected item's workspace-relative directory.
pub const ITEM_PLACEHOLDER: &str = "{item}";

/// Errors from loading or checking migration scripts
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read migration script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid migration script {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("path '{0}' must be relative and stay inside the workspace")]
    UnsafePath(String),
}

/// Which items a migration affects, found by globbing the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AffectsDef {
    /// Workspace-relative glob; each match is one item, named after its
    /// parent directory.
    pub glob: String,
    /// JSON pointer into the matched file holding the item's current version.
    #[serde(default)]
    pub version_pointer: Option<String>,
}

/// A single file operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptStep {
    Write {
        path: String,
        contents: String,
    },
    Rename {
        from: String,
        to: String,
    },
    Remove {
        path: String,
    },
    JsonSet {
        path: String,
        pointer: String,
        value: Value,
    },
    /// Abort the migration with a message.
    Fail {
        message: String,
    },
}

impl ScriptStep {
    /// Every path template this step touches.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Write { path, .. } | Self::Remove { path } | Self::JsonSet { path, .. } => {
                vec![path.as_str()]
            }
            Self::Rename { from, to } => vec![from.as_str(), to.as_str()],
            Self::Fail { .. } => Vec::new(),
        }
    }

    /// Whether the step runs once per affected item.
    pub fn is_per_item(&self) -> bool {
        self.paths().iter().any(|p| p.contains(ITEM_PLACEHOLDER))
    }

    /// Copy of this step with `{item}` replaced by `item_dir`.
    pub fn for_item(&self, item_dir: &str) -> Self {
        let sub = |s: &String| s.replace(ITEM_PLACEHOLDER, item_dir);
        match self {
            Self::Write { path, contents } => Self::Write {
                path: sub(path),
                contents: contents.clone(),
            },
            Self::Rename { from, to } => Self::Rename {
                from: sub(from),
                to: sub(to),
            },
            Self::Remove { path } => Self::Remove { path: sub(path) },
            Self::JsonSet {
                path,
                pointer,
                value,
            } => Self::JsonSet {
                path: sub(path),
                pointer: pointer.clone(),
                value: value.clone(),
            },
            Self::Fail { message } => Self::Fail {
                message: message.clone(),
            },
        }
    }
}

/// Parsed contents of a migration script file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MigrationScript {
    #[serde(default)]
    pub affects: Option<AffectsDef>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl MigrationScript {
    /// Location of the script for `id` inside the migrations directory.
    pub fn path_for(migrations_dir: &Path, id: &MigrationId) -> PathBuf {
        migrations_dir.join(format!("{}.json", id))
    }

    /// Parse script JSON and check that every path stays inside the workspace.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ScriptError> {
        let script: Self = serde_json::from_str(content).map_err(|source| ScriptError::Json {
            path: path.to_owned(),
            source,
        })?;
        for step in &script.steps {
            for template in step.paths() {
                check_relative_path(&template.replace(ITEM_PLACEHOLDER, "item"))?;
            }
        }
        if let Some(affects) = &script.affects {
            check_relative_path(&affects.glob)?;
        }
        Ok(script)
    }

    /// Load a script file. Returns `Ok(None)` when it does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ScriptError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content, path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ScriptError::Io {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

/// Load the script for every manifest entry that has one, in manifest order.
///
/// Entries without a script file are skipped; the runner reports them as
/// missing implementations only if they are actually pending.
pub fn load_scripts(
    migrations_dir: &Path,
    manifest: &Manifest,
) -> Result<IndexMap<MigrationId, MigrationScript>, ScriptError> {
    let mut scripts = IndexMap::new();
    for id in manifest.ids() {
        let path = MigrationScript::path_for(migrations_dir, id);
        if let Some(script) = MigrationScript::load(&path)? {
            debug!(migration = %id, steps = script.steps.len(), "loaded migration script");
            scripts.insert(id.clone(), script);
        }
    }
    Ok(scripts)
}

/// Reject absolute paths and `..` components.
pub fn check_relative_path(path: &str) -> Result<PathBuf, ScriptError> {
    let candidate = PathBuf::from(path);
    let safe = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(candidate)
    } else {
        Err(ScriptError::UnsafePath(path.to_string()))
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
