// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tern migration engine: migration bodies, the registry, and the runner

mod error;
mod migration;
mod runner;
mod scripted;

#[cfg(test)]
mod test_helpers;

pub use error::RunError;
pub use migration::{
    AffectedItem, Migration, MigrationContext, MigrationError, MigrationOptions, MigrationRegistry,
};
pub use runner::{
    DryRunItem, FailedMigration, MigrationOutcome, RunOptions, RunResult, Runner,
};
pub use scripted::{registry_from_scripts, ScriptedMigration, ITEMS_OPTION};
