// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Migration manifest: loading, validation, ordering, and declarative bodies

mod manifest;
mod order;
mod script;
mod validate;

pub use manifest::{read_manifest, Manifest, ManifestEntry, ManifestError};
pub use order::{order, CircularDependency};
pub use script::{
    check_relative_path, load_scripts, AffectsDef, MigrationScript, ScriptError, ScriptStep,
    ITEM_PLACEHOLDER,
};
pub use validate::{validate, ManifestIssue};
