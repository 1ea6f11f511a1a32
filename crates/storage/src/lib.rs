// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persistence for tern: workspace state, the migration journal, and
//! whole-workspace backups.

mod atomic;
mod backup;
mod journal;
mod state_store;

pub use backup::{is_excluded, BackupError, BackupManager, BackupSnapshot, DEFAULT_EXCLUDES};
pub use journal::{Journal, JournalEntry, JournalError};
pub use state_store::{StateError, StateStore};
