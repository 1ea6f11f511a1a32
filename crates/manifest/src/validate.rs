// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest validation.
//!
//! Validation never stops at the first problem: every issue found is
//! returned so the operator can fix the manifest in one pass.

use crate::Manifest;
use std::collections::HashSet;
use std::fmt;
use tern_core::MigrationId;

/// A single problem found in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestIssue {
    NotAnObject,
    MissingVersion,
    InvalidVersion,
    MigrationsNotList,
    InvalidEntry { index: usize, message: String },
    EmptyId { index: usize },
    DuplicateId(MigrationId),
    MissingDescription(MigrationId),
    MissingSchemaVersion(MigrationId),
    UnknownDependency {
        id: MigrationId,
        dependency: MigrationId,
    },
}

impl fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "manifest must be a JSON object"),
            Self::MissingVersion => write!(f, "manifest is missing a version"),
            Self::InvalidVersion => write!(f, "manifest version must be a string or number"),
            Self::MigrationsNotList => write!(f, "'migrations' must be a list"),
            Self::InvalidEntry { index, message } => {
                write!(f, "migrations[{}] is malformed: {}", index, message)
            }
            Self::EmptyId { index } => write!(f, "migrations[{}] has an empty id", index),
            Self::DuplicateId(id) => write!(f, "duplicate migration id: {}", id),
            Self::MissingDescription(id) => write!(f, "migration {} has no description", id),
            Self::MissingSchemaVersion(id) => {
                write!(f, "migration {} has no schemaVersion", id)
            }
            Self::UnknownDependency { id, dependency } => {
                write!(f, "migration {} depends on unknown migration {}", id, dependency)
            }
        }
    }
}

/// Check a manifest for structural integrity.
///
/// Checks run in a fixed order: version, duplicate IDs, required fields,
/// dependency references. An empty result means the manifest is valid.
/// Cycles are detected by [`crate::order`], not here.
pub fn validate(manifest: &Manifest) -> Vec<ManifestIssue> {
    let mut issues = Vec::new();

    let has_version = manifest
        .version
        .as_deref()
        .is_some_and(|v| !v.trim().is_empty());
    if !has_version {
        issues.push(ManifestIssue::MissingVersion);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (index, entry) in manifest.migrations.iter().enumerate() {
        if entry.id.as_str().is_empty() {
            issues.push(ManifestIssue::EmptyId { index });
        } else if !seen.insert(entry.id.as_str()) {
            issues.push(ManifestIssue::DuplicateId(entry.id.clone()));
        }
    }

    for entry in &manifest.migrations {
        if entry.description.trim().is_empty() {
            issues.push(ManifestIssue::MissingDescription(entry.id.clone()));
        }
        if entry.schema_version.trim().is_empty() {
            issues.push(ManifestIssue::MissingSchemaVersion(entry.id.clone()));
        }
    }

    for entry in &manifest.migrations {
        for dependency in &entry.dependencies {
            if !seen.contains(dependency.as_str()) {
                issues.push(ManifestIssue::UnknownDependency {
                    id: entry.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    issues
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
