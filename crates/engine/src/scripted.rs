// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration bodies driven by declarative step files.

use crate::migration::{
    AffectedItem, Migration, MigrationContext, MigrationError, MigrationRegistry,
};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path};
use tern_core::MigrationId;
use tern_manifest::{check_relative_path, AffectsDef, MigrationScript, ScriptStep};
use tracing::debug;

/// Option key holding the names of the affected items to operate on.
pub const ITEMS_OPTION: &str = "items";

const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ScriptedMigration {
    id: MigrationId,
    script: MigrationScript,
}

impl ScriptedMigration {
    pub fn new(id: MigrationId, script: MigrationScript) -> Self {
        Self { id, script }
    }

    fn selected_items(&self, ctx: &MigrationContext) -> Result<Vec<String>, MigrationError> {
        let affected: Vec<String> = self
            .affected_items(ctx.workspace_dir())?
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.name)
            .collect();

        let Some(selection) = ctx.option(ITEMS_OPTION) else {
            return Ok(affected);
        };
        let invalid = |message: String| MigrationError::InvalidOption {
            key: ITEMS_OPTION.to_string(),
            message,
        };
        let Value::Array(values) = selection else {
            return Err(invalid("expected a list of item names".to_string()));
        };
        values
            .iter()
            .map(|value| match value.as_str() {
                Some(name) if affected.iter().any(|a| a == name) => Ok(name.to_string()),
                Some(name) => Err(invalid(format!("'{}' is not an affected item", name))),
                None => Err(invalid("expected a list of item names".to_string())),
            })
            .collect()
    }
}

impl Migration for ScriptedMigration {
    fn up(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        let per_item = self.script.steps.iter().any(ScriptStep::is_per_item);
        let items = if per_item {
            self.selected_items(ctx)?
        } else {
            Vec::new()
        };

        for step in &self.script.steps {
            if step.is_per_item() {
                for item in &items {
                    run_step(ctx.workspace_dir(), &step.for_item(item))?;
                }
            } else {
                run_step(ctx.workspace_dir(), step)?;
            }
        }
        debug!(
            migration = %self.id,
            steps = self.script.steps.len(),
            items = items.len(),
            "ran migration script",
        );
        Ok(())
    }

    fn affected_items(
        &self,
        workspace_dir: &Path,
    ) -> Result<Option<Vec<AffectedItem>>, MigrationError> {
        match &self.script.affects {
            Some(affects) => find_items(workspace_dir, affects).map(Some),
            None => Ok(None),
        }
    }
}

/// Build a registry with one scripted body per loaded script.
pub fn registry_from_scripts(scripts: IndexMap<MigrationId, MigrationScript>) -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    for (id, script) in scripts {
        registry.register(id.clone(), ScriptedMigration::new(id, script));
    }
    registry
}

fn find_items(
    workspace_dir: &Path,
    affects: &AffectsDef,
) -> Result<Vec<AffectedItem>, MigrationError> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&workspace_dir.to_string_lossy()),
        affects.glob
    );

    let mut items = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| MigrationError::msg(e.to_string()))?;
        let Ok(rel) = path.strip_prefix(workspace_dir) else {
            continue;
        };
        let name = rel.parent().map(slash_path).unwrap_or_default();
        let current_version = match &affects.version_pointer {
            Some(pointer) => read_version(&path, pointer),
            None => UNKNOWN_VERSION.to_string(),
        };
        items.push(AffectedItem {
            name: if name.is_empty() { ".".to_string() } else { name },
            current_version,
        });
    }
    Ok(items)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn read_version(path: &Path, pointer: &str) -> String {
    let value = fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    match value.as_ref().and_then(|doc| doc.pointer(pointer)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => UNKNOWN_VERSION.to_string(),
        Some(other) => other.to_string(),
    }
}

fn run_step(root: &Path, step: &ScriptStep) -> Result<(), MigrationError> {
    match step {
        ScriptStep::Write { path, contents } => {
            let target = root.join(check_relative_path(path)?);
            create_parent(&target)?;
            fs::write(&target, contents).map_err(MigrationError::io(&target))
        }
        ScriptStep::Rename { from, to } => {
            let src = root.join(check_relative_path(from)?);
            let dst = root.join(check_relative_path(to)?);
            create_parent(&dst)?;
            fs::rename(&src, &dst).map_err(MigrationError::io(&src))
        }
        ScriptStep::Remove { path } => {
            let target = root.join(check_relative_path(path)?);
            let removed = if target.is_dir() {
                fs::remove_dir_all(&target)
            } else {
                fs::remove_file(&target)
            };
            match removed {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    Err(MigrationError::io(&target)(e))
                }
                _ => Ok(()),
            }
        }
        ScriptStep::JsonSet {
            path,
            pointer,
            value,
        } => {
            let target = root.join(check_relative_path(path)?);
            let bytes = fs::read(&target).map_err(MigrationError::io(&target))?;
            let mut doc: Value =
                serde_json::from_slice(&bytes).map_err(|source| MigrationError::Json {
                    path: target.clone(),
                    source,
                })?;
            set_pointer(&mut doc, pointer, value.clone()).map_err(MigrationError::Failed)?;
            let mut out = serde_json::to_string_pretty(&doc).map_err(|source| {
                MigrationError::Json {
                    path: target.clone(),
                    source,
                }
            })?;
            out.push('\n');
            fs::write(&target, out).map_err(MigrationError::io(&target))
        }
        ScriptStep::Fail { message } => Err(MigrationError::Failed(message.clone())),
    }
}

fn create_parent(path: &Path) -> Result<(), MigrationError> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(MigrationError::io(parent)),
        None => Ok(()),
    }
}

/// Set the value at a JSON pointer, creating intermediate objects.
///
/// `-` as the last array token appends.
pub(crate) fn set_pointer(doc: &mut Value, pointer: &str, value: Value) -> Result<(), String> {
    if pointer.is_empty() {
        *doc = value;
        return Ok(());
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return Err(format!("JSON pointer '{}' must start with '/'", pointer));
    };
    let tokens: Vec<String> = rest
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect();

    let mut current = doc;
    let last = tokens.len() - 1;
    for (i, token) in tokens.iter().enumerate() {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) if i == last => {
                map.insert(token.clone(), value);
                return Ok(());
            }
            Value::Object(map) => map.entry(token.clone()).or_insert(Value::Null),
            Value::Array(list) => {
                if i == last && token == "-" {
                    list.push(value);
                    return Ok(());
                }
                let index: usize = token
                    .parse()
                    .map_err(|_| format!("'{}' is not an array index in '{}'", token, pointer))?;
                let len = list.len();
                let slot = list
                    .get_mut(index)
                    .ok_or_else(|| format!("index {} out of range ({}) in '{}'", index, len, pointer))?;
                if i == last {
                    *slot = value;
                    return Ok(());
                }
                slot
            }
            _ => return Err(format!("'{}' does not point into an object or array", pointer)),
        };
    }
    Ok(())
}

#[cfg(test)]
#[path = "scripted_tests.rs"]
mod tests;
