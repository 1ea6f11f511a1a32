// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI crate.

use std::path::PathBuf;

// --- Workspace ---

/// Workspace root override (`TERN_WORKSPACE`).
pub fn workspace_dir() -> Option<PathBuf> {
    std::env::var("TERN_WORKSPACE")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

// --- Logging ---

/// Tracing filter directives (`TERN_LOG`), e.g. `debug` or `tern_engine=trace`.
pub fn log_filter() -> Option<String> {
    std::env::var("TERN_LOG").ok().filter(|s| !s.is_empty())
}

// --- Color ---

pub fn no_color() -> bool {
    std::env::var("NO_COLOR").is_ok_and(|v| v == "1")
}

pub fn force_color() -> bool {
    std::env::var("COLOR").is_ok_and(|v| v == "1")
}
