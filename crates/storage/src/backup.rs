// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup Manager: whole-workspace snapshots taken before a migration batch.
//!
//! A backup is a directory under `.tern/backups/<id>/` holding a byte-for-byte
//! mirror of every non-excluded regular file (`files/`) and a metadata
//! document (`backup.json`) listing exactly what was captured.
//!
//! Restore only overwrites files listed in the metadata. Files created after
//! the backup was taken are left in place.

use crate::atomic::write_json;
use crate::state_store::{StateError, StateStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tern_core::layout::{BACKUP_FILES_DIR, BACKUP_METADATA_FILE};
use tern_core::{BackupId, Clock, SystemClock, WorkspaceLayout};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Dependency caches, VCS metadata and build output never worth snapshotting.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "target",
    ".cache",
    ".turbo",
    ".next",
];

/// Errors that can occur in backup operations
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("cannot back up workspace without state: {0} not found")]
    StateNotFound(PathBuf),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("backup not found: {0}")]
    NotFound(BackupId),
    #[error("invalid backup id '{0}': must be a single path component")]
    InvalidId(BackupId),
    #[error("backup I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk workspace: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("backup metadata {path} is invalid: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_owned(),
        source,
    }
}

/// Metadata document (`backup.json`) describing one backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub backup_id: BackupId,
    pub created_at: DateTime<Utc>,
    pub workspace_dir: PathBuf,
    pub tool_version_at_backup: String,
    /// Workspace-relative paths, in walk order.
    pub files: Vec<PathBuf>,
    /// SHA-256 (hex) of each captured file.
    #[serde(default)]
    pub checksums: BTreeMap<PathBuf, String>,
}

/// Whether a workspace-relative path falls under any exclusion.
///
/// Matching is by whole path components: `build` excludes `build/out.js`
/// but not `builder/x`.
pub fn is_excluded(rel: &Path, excludes: &[PathBuf]) -> bool {
    excludes.iter().any(|prefix| rel.starts_with(prefix))
}

fn normalize_exclude(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

pub struct BackupManager<C: Clock = SystemClock> {
    layout: WorkspaceLayout,
    clock: C,
    excludes: Vec<PathBuf>,
}

impl BackupManager<SystemClock> {
    pub fn new(layout: WorkspaceLayout) -> Self {
        let mut excludes: Vec<PathBuf> = DEFAULT_EXCLUDES.iter().map(PathBuf::from).collect();
        excludes.extend(WorkspaceLayout::internal_exclusions());
        Self {
            layout,
            clock: SystemClock,
            excludes,
        }
    }
}

impl<C: Clock> BackupManager<C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> BackupManager<C2> {
        BackupManager {
            layout: self.layout,
            clock,
            excludes: self.excludes,
        }
    }

    /// Add exclusion prefixes on top of the defaults.
    pub fn with_excludes<I, P>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in extra {
            let path = normalize_exclude(path.as_ref());
            if !path.as_os_str().is_empty() && !self.excludes.contains(&path) {
                self.excludes.push(path);
            }
        }
        self
    }

    pub fn excludes(&self) -> &[PathBuf] {
        &self.excludes
    }

    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Snapshot the workspace. Requires a state document.
    pub fn create(&self) -> Result<BackupId, BackupError> {
        let store = StateStore::new(&self.layout);
        let state = store
            .load()?
            .ok_or_else(|| BackupError::StateNotFound(store.path().to_owned()))?;

        let now = self.clock.now();
        let backup_id = self.unused_id(now);
        let backup_dir = self.layout.backup_dir(&backup_id);
        fs::create_dir_all(&backup_dir).map_err(io_at(&backup_dir))?;

        match self.capture(&backup_dir) {
            Ok((files, checksums)) => {
                let snapshot = BackupSnapshot {
                    backup_id: backup_id.clone(),
                    created_at: now,
                    workspace_dir: self.layout.root().to_owned(),
                    tool_version_at_backup: state.tool_version,
                    files,
                    checksums,
                };
                let metadata = backup_dir.join(BACKUP_METADATA_FILE);
                write_json(&metadata, &snapshot).map_err(io_at(&metadata))?;
                info!(
                    backup = %backup_id,
                    files = snapshot.files.len(),
                    "created workspace backup",
                );
                Ok(backup_id)
            }
            Err(e) => {
                // partial backups have no metadata; remove them
                let _ = fs::remove_dir_all(&backup_dir);
                Err(e)
            }
        }
    }

    /// Overwrite every file listed in the backup with its captured content.
    ///
    /// Returns the number of files restored.
    pub fn restore(&self, id: &BackupId) -> Result<usize, BackupError> {
        let snapshot = self.load(id)?;
        let mirror = self.checked_dir(id)?.join(BACKUP_FILES_DIR);
        let root = self.layout.root();

        for rel in &snapshot.files {
            let src = mirror.join(rel);
            let dst = root.join(rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(io_at(parent))?;
            }
            fs::copy(&src, &dst).map_err(io_at(&src))?;
        }

        info!(backup = %id, files = snapshot.files.len(), "restored workspace from backup");
        Ok(snapshot.files.len())
    }

    /// Remove a backup. Returns `false` if it was already gone.
    pub fn delete(&self, id: &BackupId) -> Result<bool, BackupError> {
        let dir = self.checked_dir(id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(backup = %id, "deleted backup");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_at(&dir)(e)),
        }
    }

    /// All readable backups, newest first.
    pub fn list(&self) -> Result<Vec<BackupSnapshot>, BackupError> {
        let dir = self.layout.backups_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_at(&dir)(e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_at(&dir))?;
            if !entry.file_type().map_err(io_at(&dir))?.is_dir() {
                continue;
            }
            let id = BackupId::new(entry.file_name().to_string_lossy());
            match self.load(&id) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!(backup = %id, error = %e, "skipping unreadable backup"),
            }
        }

        snapshots.sort_by(|a, b| b.backup_id.cmp(&a.backup_id));
        Ok(snapshots)
    }

    /// Read a backup's metadata.
    pub fn load(&self, id: &BackupId) -> Result<BackupSnapshot, BackupError> {
        let path = self.checked_dir(id)?.join(BACKUP_METADATA_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::NotFound(id.clone()))
            }
            Err(e) => return Err(io_at(&path)(e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| BackupError::Metadata { path, source })
    }

    /// Files whose mirror copy is missing or no longer matches its checksum.
    pub fn verify(&self, id: &BackupId) -> Result<Vec<PathBuf>, BackupError> {
        let snapshot = self.load(id)?;
        let mirror = self.checked_dir(id)?.join(BACKUP_FILES_DIR);

        let mut damaged = Vec::new();
        for rel in &snapshot.files {
            let actual = match sha256_file(&mirror.join(rel)) {
                Ok(digest) => Some(digest),
                Err(e) if e.kind() == io::ErrorKind::NotFound => None,
                Err(e) => return Err(io_at(&mirror.join(rel))(e)),
            };
            if actual.is_none() || actual.as_ref() != snapshot.checksums.get(rel) {
                damaged.push(rel.clone());
            }
        }
        Ok(damaged)
    }

    /// Directory for `id`, which must name exactly one normal path component
    /// so it cannot resolve outside the backups directory.
    fn checked_dir(&self, id: &BackupId) -> Result<PathBuf, BackupError> {
        let mut components = Path::new(id.as_str()).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == id.as_str() => {
                Ok(self.layout.backup_dir(id))
            }
            _ => Err(BackupError::InvalidId(id.clone())),
        }
    }

    fn unused_id(&self, now: DateTime<Utc>) -> BackupId {
        let base = BackupId::from_timestamp(now);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.layout.backup_dir(&candidate).exists() {
            candidate = base.with_suffix(n);
            n += 1;
        }
        candidate
    }

    /// Copy every non-excluded regular file into `backup_dir/files`.
    fn capture(
        &self,
        backup_dir: &Path,
    ) -> Result<(Vec<PathBuf>, BTreeMap<PathBuf, String>), BackupError> {
        let root = self.layout.root();
        let mirror = backup_dir.join(BACKUP_FILES_DIR);
        let mut files = Vec::new();
        let mut checksums = BTreeMap::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| match e.path().strip_prefix(root) {
                Ok(rel) => rel.as_os_str().is_empty() || !is_excluded(rel, &self.excludes),
                Err(_) => false,
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };

            let dst = mirror.join(rel);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent).map_err(io_at(parent))?;
            }
            fs::copy(entry.path(), &dst).map_err(io_at(entry.path()))?;
            let digest = sha256_file(&dst).map_err(io_at(&dst))?;

            files.push(rel.to_owned());
            checksums.insert(rel.to_owned(), digest);
        }

        Ok((files, checksums))
    }
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
