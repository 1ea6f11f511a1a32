// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tern-core: shared types for the tern workspace migration engine

pub mod clock;
pub mod config;
pub mod id;
pub mod layout;
pub mod time_fmt;
pub mod workspace;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{BackupConfig, ConfigError, WorkspaceConfig};
pub use id::{BackupId, MigrationId};
pub use layout::{find_workspace_root, WorkspaceLayout, STATE_DIR};
pub use time_fmt::{format_age, format_elapsed};
pub use workspace::{AppliedMigration, WorkspaceState};
