// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes for migrations and backups

use chrono::{DateTime, Utc};

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
/// IDs order lexicographically.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the ID type.
///     pub struct MyId;
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Stable identifier of a registered migration (never reused once shipped).
    pub struct MigrationId;
}

define_id! {
    /// Identifier of a backup snapshot.
    ///
    /// Derived from the creation timestamp so that lexicographic order is
    /// chronological order.
    pub struct BackupId;
}

/// Timestamp layout for backup IDs: filesystem-safe, fixed width, sortable.
const BACKUP_ID_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

impl BackupId {
    /// Build the ID for a backup taken at `at`.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.format(BACKUP_ID_FORMAT).to_string())
    }

    /// Same timestamp with a numeric suffix, used when two backups land in
    /// the same millisecond. Suffixed IDs still sort after the bare one, and
    /// the zero padding keeps `-002` before `-010`.
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}-{:03}", self.0, n))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
