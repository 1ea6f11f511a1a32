// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency resolution: a deterministic topological order of migrations.

use crate::Manifest;
use std::collections::HashMap;
use tern_core::MigrationId;
use thiserror::Error;

/// The dependency graph contains a cycle through the named migration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circular dependency detected at migration '{0}'")]
pub struct CircularDependency(pub MigrationId);

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Order every manifest entry so that each migration comes after all of
/// its dependencies.
///
/// Roots are visited in declaration order and dependencies in the order
/// they are listed, so siblings with no constraint between them keep their
/// declared order. Unknown dependency IDs are ignored here; validation
/// reports them. The walk uses an explicit stack, so chain length is bounded
/// by memory rather than by the call stack.
pub fn order(manifest: &Manifest) -> Result<Vec<MigrationId>, CircularDependency> {
    let mut entries: HashMap<&str, &[MigrationId]> = HashMap::new();
    for entry in &manifest.migrations {
        entries
            .entry(entry.id.as_str())
            .or_insert(entry.dependencies.as_slice());
    }

    let mut marks: HashMap<&str, Mark> = entries.keys().map(|id| (*id, Mark::Unvisited)).collect();
    let mut ordered = Vec::with_capacity(entries.len());

    for entry in &manifest.migrations {
        visit(&entry.id, &entries, &mut marks, &mut ordered)?;
    }
    Ok(ordered)
}

/// Depth-first post-order walk from `root`.
fn visit<'a>(
    root: &'a MigrationId,
    entries: &HashMap<&'a str, &'a [MigrationId]>,
    marks: &mut HashMap<&'a str, Mark>,
    ordered: &mut Vec<MigrationId>,
) -> Result<(), CircularDependency> {
    if !enter(root, entries, marks)? {
        return Ok(());
    }

    // (node, index of its next dependency to visit)
    let mut stack: Vec<(&'a MigrationId, usize)> = vec![(root, 0)];
    while let Some(frame) = stack.last_mut() {
        let (id, next) = *frame;
        frame.1 += 1;

        let dependency = entries
            .get(id.as_str())
            .copied()
            .and_then(|dependencies| dependencies.get(next));
        match dependency {
            Some(dependency) => {
                if enter(dependency, entries, marks)? {
                    stack.push((dependency, 0));
                }
            }
            None => {
                marks.insert(id.as_str(), Mark::Done);
                ordered.push(id.clone());
                stack.pop();
            }
        }
    }
    Ok(())
}

/// Put `id` on the current path. Returns `false` when it is unknown or
/// already ordered.
fn enter<'a>(
    id: &'a MigrationId,
    entries: &HashMap<&'a str, &'a [MigrationId]>,
    marks: &mut HashMap<&'a str, Mark>,
) -> Result<bool, CircularDependency> {
    if !entries.contains_key(id.as_str()) {
        return Ok(false);
    }
    match marks.get(id.as_str()).copied().unwrap_or(Mark::Unvisited) {
        Mark::Done => Ok(false),
        Mark::OnPath => Err(CircularDependency(id.clone())),
        Mark::Unvisited => {
            marks.insert(id.as_str(), Mark::OnPath);
            Ok(true)
        }
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
