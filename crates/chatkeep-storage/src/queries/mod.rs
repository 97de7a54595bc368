// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the checkpoint, pending-write and buffer tables.
//!
//! Table names are interpolated into the SQL text; callers pass names that
//! went through [`crate::schema::validated_table_name`].

pub mod buffer;
pub mod checkpoints;
pub mod writes;

use crate::keys;

/// Bounds selecting the sort keys of exactly one namespace.
///
/// `[lower, upper)` covers every key starting with the namespace prefix; the
/// `tail_start` check additionally drops keys of nested namespaces such as
/// `"a#b#..."` when listing namespace `"a"`.
pub(crate) struct NamespaceRange {
    pub lower: String,
    pub upper: String,
    /// 1-based character position of the first character after the prefix.
    pub tail_start: i64,
}

impl NamespaceRange {
    pub fn checkpoints(ns: &str) -> Self {
        Self::for_prefix(keys::checkpoint_prefix(ns))
    }

    pub fn writes(ns: &str, checkpoint_id: &str) -> Self {
        Self::for_prefix(keys::writes_prefix(ns, checkpoint_id))
    }

    fn for_prefix(prefix: String) -> Self {
        let upper = keys::prefix_upper_bound(&prefix);
        let tail_start = prefix.chars().count() as i64 + 1;
        Self {
            lower: prefix,
            upper,
            tail_start,
        }
    }
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
