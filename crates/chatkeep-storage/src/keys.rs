// SPDX-FileCopyrightText: 2026 Chatkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sort-key construction for checkpoint and pending-write records.
//!
//! Numeric key parts are zero-padded so that byte order equals numeric order:
//! `"{ns}#{millis:020}"` for checkpoints and
//! `"{ns}#{checkpoint_id}#{task_id}#{idx:010}"` for pending writes.

/// Separator between sort-key segments.
pub const SEP: char = '#';

/// Digits used for the checkpoint creation time.
pub const MILLIS_WIDTH: usize = 20;

/// Digits used for a pending write's position within its task.
pub const IDX_WIDTH: usize = 10;

pub fn checkpoint_sort_key(ns: &str, millis: u64) -> String {
    format!("{ns}{SEP}{millis:0MILLIS_WIDTH$}")
}

pub fn write_sort_key(ns: &str, checkpoint_id: &str, task_id: &str, idx: usize) -> String {
    format!("{ns}{SEP}{checkpoint_id}{SEP}{task_id}{SEP}{idx:0IDX_WIDTH$}")
}

/// Prefix shared by every checkpoint of one namespace.
pub fn checkpoint_prefix(ns: &str) -> String {
    format!("{ns}{SEP}")
}

/// Prefix shared by every pending write of one checkpoint.
pub fn writes_prefix(ns: &str, checkpoint_id: &str) -> String {
    format!("{ns}{SEP}{checkpoint_id}{SEP}")
}

/// Exclusive upper bound of the key range that starts with `prefix`.
///
/// Every prefix built here ends in [`SEP`], so bumping that last byte to the
/// next code point (`'$'`) bounds the range.
pub fn prefix_upper_bound(prefix: &str) -> String {
    match prefix.strip_suffix(SEP) {
        Some(head) => format!("{head}$"),
        None => format!("{prefix}\u{10FFFF}"),
    }
}

/// Creation millis encoded in a checkpoint sort key.
pub fn checkpoint_millis(sort_key: &str) -> Option<u64> {
    let (_, millis) = sort_key.rsplit_once(SEP)?;
    if millis.len() != MILLIS_WIDTH {
        return None;
    }
    millis.parse().ok()
}

/// Namespace part of a checkpoint sort key.
pub fn checkpoint_namespace(sort_key: &str) -> Option<&str> {
    sort_key.rsplit_once(SEP).map(|(ns, _)| ns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checkpoint_key_is_padded() {
        assert_eq!(checkpoint_sort_key("", 1_700_000_000_000), "#00000001700000000000");
        assert_eq!(checkpoint_sort_key("sub", 5), "sub#00000000000000000005");
    }

    #[test]
    fn write_key_is_padded() {
        assert_eq!(
            write_sort_key("", "cp-1", "task-a", 3),
            "#cp-1#task-a#0000000003"
        );
    }

    #[test]
    fn prefixes_end_with_separator() {
        assert_eq!(checkpoint_prefix("ns"), "ns#");
        assert_eq!(writes_prefix("ns", "cp"), "ns#cp#");
        assert_eq!(prefix_upper_bound("ns#cp#"), "ns#cp$");
    }

    #[test]
    fn parses_millis_and_namespace_back() {
        let key = checkpoint_sort_key("a#b", 42);
        assert_eq!(checkpoint_millis(&key), Some(42));
        assert_eq!(checkpoint_namespace(&key), Some("a#b"));
        assert_eq!(checkpoint_millis("ns#12"), None);
        assert_eq!(checkpoint_millis("no-separator"), None);
    }

    proptest! {
        #[test]
        fn key_order_matches_millis_order(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
            let ka = checkpoint_sort_key("ns", a);
            let kb = checkpoint_sort_key("ns", b);
            prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        }

        #[test]
        fn write_key_order_matches_idx_order(a in 0usize..1_000_000, b in 0usize..1_000_000) {
            let ka = write_sort_key("", "cp", "t", a);
            let kb = write_sort_key("", "cp", "t", b);
            prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        }

        #[test]
        fn prefixed_keys_fall_inside_range(ns in "[a-z]{0,6}", millis in 0u64..10_000_000_000_000) {
            let prefix = checkpoint_prefix(&ns);
            let upper = prefix_upper_bound(&prefix);
            let key = checkpoint_sort_key(&ns, millis);
            prop_assert!(key.as_str() >= prefix.as_str());
            prop_assert!(key.as_str() < upper.as_str());
        }
    }
}
