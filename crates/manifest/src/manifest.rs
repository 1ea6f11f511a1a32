// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest document (`.tern/migrations/migrations.json`)

use crate::validate::{validate, ManifestIssue};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tern_core::layout::MANIFEST_FILE;
use tern_core::MigrationId;
use thiserror::Error;

/// Errors that can occur while reading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("manifest has an invalid shape:\n{}", render_issues(.0))]
    Shape(Vec<ManifestIssue>),
}

fn render_issues(issues: &[ManifestIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accept `"2"` and `2` alike; `null` reads as empty so validation reports it.
fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// One registered migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: MigrationId,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub schema_version: String,
    /// Surfaced in previews so the operator notices; execution is unchanged.
    #[serde(default)]
    pub breaking: bool,
    #[serde(default)]
    pub dependencies: Vec<MigrationId>,
}

impl ManifestEntry {
    pub fn new(id: impl Into<MigrationId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            schema_version: "1".to_string(),
            breaking: false,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies = ids.iter().map(|id| MigrationId::new(*id)).collect();
        self
    }

    pub fn breaking(mut self) -> Self {
        self.breaking = true;
        self
    }
}

/// Catalog of every migration the tool knows about, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub migrations: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(version: impl Into<String>, migrations: Vec<ManifestEntry>) -> Self {
        Self {
            version: Some(version.into()),
            migrations,
        }
    }

    /// Build a manifest from an already-parsed JSON document.
    ///
    /// Structural problems (document not an object, `migrations` not a list,
    /// malformed entries) are collected and returned together. Malformed
    /// entries are dropped and the rest of the document is still validated,
    /// so the returned list also carries every [`crate::validate`] issue.
    pub fn from_value(value: Value) -> Result<Self, Vec<ManifestIssue>> {
        let Value::Object(mut doc) = value else {
            return Err(vec![ManifestIssue::NotAnObject]);
        };

        let mut issues = Vec::new();

        let version = match doc.remove("version") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                issues.push(ManifestIssue::InvalidVersion);
                None
            }
        };

        let raw_entries = match doc.remove("migrations") {
            Some(Value::Array(entries)) => entries,
            _ => {
                issues.push(ManifestIssue::MigrationsNotList);
                Vec::new()
            }
        };

        let mut migrations = Vec::with_capacity(raw_entries.len());
        let mut dropped_ids = HashSet::new();
        for (index, raw) in raw_entries.into_iter().enumerate() {
            let id = raw.get("id").and_then(Value::as_str).map(str::to_owned);
            match serde_json::from_value::<ManifestEntry>(raw) {
                Ok(entry) => migrations.push(entry),
                Err(e) => {
                    dropped_ids.extend(id);
                    issues.push(ManifestIssue::InvalidEntry {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }

        let manifest = Self {
            version,
            migrations,
        };
        if issues.is_empty() {
            return Ok(manifest);
        }

        let version_reported = issues.contains(&ManifestIssue::InvalidVersion);
        issues.extend(validate(&manifest).into_iter().filter(|issue| match issue {
            ManifestIssue::MissingVersion => !version_reported,
            // the dependency exists; its entry is already reported as malformed
            ManifestIssue::UnknownDependency { dependency, .. } => {
                !dropped_ids.contains(dependency.as_str())
            }
            _ => true,
        }));
        Err(issues)
    }

    pub fn get(&self, id: &str) -> Option<&ManifestEntry> {
        self.migrations.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MigrationId> {
        self.migrations.iter().map(|entry| &entry.id)
    }
}

/// Read `migrations.json` from `dir`.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_manifest(dir: &Path) -> Result<Option<Manifest>, ManifestError> {
    let path = dir.join(MANIFEST_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(ManifestError::Io { path, source }),
    };
    let value: Value =
        serde_json::from_str(&content).map_err(|source| ManifestError::Json { path, source })?;
    Manifest::from_value(value)
        .map(Some)
        .map_err(ManifestError::Shape)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
