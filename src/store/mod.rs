//! Durable store gateway.
//!
//! Thin adapter exposing the set/list/sorted-set operations the core needs
//! from an external key-value store. Any backend that honours this
//! contract is acceptable; `SledStore` and `MemoryStore` are the two
//! implementations shipped here.

mod memory_store;
mod sled_store;

pub use memory_store::MemoryStore;
pub use sled_store::SledStore;

use anyhow::Result;

/// The owner of a group holds score `0`; every other member holds `10`.
pub const OWNER_SCORE: i64 = 0;
pub const MEMBER_SCORE: i64 = 10;

/// The set/list/sorted-set contract the core needs from a durable store.
/// All operations are assumed to succeed; failure propagates as an error
/// on the triggering command.
pub trait Store: Send + Sync {
    /// Idempotent add; returns `true` if newly added, `false` if already present.
    fn set_add(&self, key: &str, member: &str) -> Result<bool>;
    fn set_is_member(&self, key: &str, member: &str) -> Result<bool>;
    fn set_members(&self, key: &str) -> Result<Vec<String>>;
    /// Members in `a` but not in `b`.
    fn set_diff(&self, a: &str, b: &str) -> Result<Vec<String>>;
    /// Removes; returns `true` if the member was present.
    fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    fn string_get(&self, key: &str) -> Result<Option<String>>;
    fn string_set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes keys from every entity kind (no-op for keys that don't exist).
    fn key_delete(&self, keys: &[&str]) -> Result<()>;

    fn list_push_right(&self, key: &str, elems: &[&str]) -> Result<()>;
    /// `-1` as `stop` means "to the end".
    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
    fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()>;
    /// Removes up to `count` occurrences of `value` (`0` means "all"); returns the count removed.
    fn list_remove(&self, key: &str, count: i64, value: &str) -> Result<i64>;

    /// Inserts or updates the member's score; returns `true` if this was an insert.
    fn zset_add(&self, key: &str, score: i64, member: &str) -> Result<bool>;
    /// Members ordered ascending by score, `start..=stop` by rank (`-1` = last).
    fn zset_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;
    fn zset_rank(&self, key: &str, member: &str) -> Result<Option<i64>>;
    /// Removes; returns `true` if the member was present.
    fn zset_remove(&self, key: &str, member: &str) -> Result<bool>;
}

/// Resolve a `start..=stop` slice over `len` items using the list/zset
/// range convention where `-1` denotes the last index.
pub(crate) fn resolve_range(len: usize, start: i64, stop: i64) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let len_i = len as i64;
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len_i + i).max(0)
        } else {
            i
        }
    };
    let s = norm(start).min(len_i - 1).max(0) as usize;
    let e = norm(stop).min(len_i - 1).max(0) as usize;
    if s > e {
        (0, 0)
    } else {
        (s, e + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_range_to_end() {
        assert_eq!(resolve_range(5, 0, -1), (0, 5));
        assert_eq!(resolve_range(5, 2, -1), (2, 5));
        assert_eq!(resolve_range(0, 0, -1), (0, 0));
        assert_eq!(resolve_range(5, 3, 1), (0, 0));
    }
}
