//! The default, durable `Store` implementation, backed by `sled`: one
//! `sled` database per store, `rmp_serde` for encoding, `anyhow::Context`
//! for error messages, `trace!` for per-operation logging.

use super::{resolve_range, Store};
use anyhow::{Context, Result};
use log::trace;
use serde::{de::DeserializeOwned, Serialize};
use sled::Tree;
use std::{
    collections::{BTreeMap, HashSet},
    path::Path,
};

/// A `Store` backed by four `sled` trees, one per entity kind.
pub struct SledStore {
    sets: Tree,
    lists: Tree,
    zsets: Tree,
    strings: Tree,
}

impl SledStore {
    /// Open the database, whereas `path` has to be a directory.
    pub fn open(path: &Path) -> Result<Self> {
        trace!("Opening durable store at {}", path.display());
        let db = sled::open(path)
            .with_context(|| format!("failed to open store path {}", path.display()))?;
        Ok(Self {
            sets: db.open_tree("sets").context("open sets tree")?,
            lists: db.open_tree("lists").context("open lists tree")?,
            zsets: db.open_tree("zsets").context("open zsets tree")?,
            strings: db.open_tree("strings").context("open strings tree")?,
        })
    }

    fn get<T: DeserializeOwned + Default>(tree: &Tree, key: &str) -> Result<T> {
        match tree.get(key).context("read key")? {
            None => Ok(T::default()),
            Some(v) => rmp_serde::from_slice(&v).context("decode value"),
        }
    }

    fn put<T: Serialize>(tree: &Tree, key: &str, value: &T) -> Result<()> {
        let encoded = rmp_serde::to_vec(value).context("encode value")?;
        tree.insert(key, encoded).context("write key")?;
        Ok(())
    }

    fn sorted_zset(zset: &BTreeMap<String, i64>) -> Vec<String> {
        let mut members: Vec<_> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members.into_iter().map(|(m, _)| m).collect()
    }
}

impl Store for SledStore {
    fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut set: HashSet<String> = Self::get(&self.sets, key)?;
        let added = set.insert(member.to_string());
        if added {
            Self::put(&self.sets, key, &set)?;
        }
        trace!("set_add {} {} -> {}", key, member, added);
        Ok(added)
    }

    fn set_is_member(&self, key: &str, member: &str) -> Result<bool> {
        let set: HashSet<String> = Self::get(&self.sets, key)?;
        Ok(set.contains(member))
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let set: HashSet<String> = Self::get(&self.sets, key)?;
        Ok(set.into_iter().collect())
    }

    fn set_diff(&self, a: &str, b: &str) -> Result<Vec<String>> {
        let set_a: HashSet<String> = Self::get(&self.sets, a)?;
        let set_b: HashSet<String> = Self::get(&self.sets, b)?;
        Ok(set_a.difference(&set_b).cloned().collect())
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut set: HashSet<String> = Self::get(&self.sets, key)?;
        let removed = set.remove(member);
        if removed {
            Self::put(&self.sets, key, &set)?;
        }
        Ok(removed)
    }

    fn string_get(&self, key: &str) -> Result<Option<String>> {
        match self.strings.get(key).context("read string")? {
            None => Ok(None),
            Some(v) => Ok(Some(String::from_utf8(v.to_vec()).context("decode string")?)),
        }
    }

    fn string_set(&self, key: &str, value: &str) -> Result<()> {
        self.strings
            .insert(key, value.as_bytes())
            .context("write string")?;
        Ok(())
    }

    fn key_delete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.sets.remove(key).context("delete from sets")?;
            self.lists.remove(key).context("delete from lists")?;
            self.zsets.remove(key).context("delete from zsets")?;
            self.strings.remove(key).context("delete from strings")?;
        }
        Ok(())
    }

    fn list_push_right(&self, key: &str, elems: &[&str]) -> Result<()> {
        let mut list: Vec<String> = Self::get(&self.lists, key)?;
        list.extend(elems.iter().map(|e| e.to_string()));
        Self::put(&self.lists, key, &list)
    }

    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let list: Vec<String> = Self::get(&self.lists, key)?;
        let (s, e) = resolve_range(list.len(), start, stop);
        Ok(list[s..e].to_vec())
    }

    fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()> {
        let mut list: Vec<String> = Self::get(&self.lists, key)?;
        if index >= 0 && (index as usize) < list.len() {
            list[index as usize] = value.to_string();
            Self::put(&self.lists, key, &list)?;
        }
        Ok(())
    }

    fn list_remove(&self, key: &str, count: i64, value: &str) -> Result<i64> {
        let mut list: Vec<String> = Self::get(&self.lists, key)?;
        let limit = if count <= 0 { usize::MAX } else { count as usize };
        let mut removed = 0i64;
        let mut kept = Vec::with_capacity(list.len());
        for item in list.drain(..) {
            if item == value && (removed as usize) < limit {
                removed += 1;
            } else {
                kept.push(item);
            }
        }
        Self::put(&self.lists, key, &kept)?;
        Ok(removed)
    }

    fn zset_add(&self, key: &str, score: i64, member: &str) -> Result<bool> {
        let mut zset: BTreeMap<String, i64> = Self::get(&self.zsets, key)?;
        let inserted = zset.insert(member.to_string(), score).is_none();
        Self::put(&self.zsets, key, &zset)?;
        Ok(inserted)
    }

    fn zset_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let zset: BTreeMap<String, i64> = Self::get(&self.zsets, key)?;
        let members = Self::sorted_zset(&zset);
        let (s, e) = resolve_range(members.len(), start, stop);
        Ok(members[s..e].to_vec())
    }

    fn zset_rank(&self, key: &str, member: &str) -> Result<Option<i64>> {
        let zset: BTreeMap<String, i64> = Self::get(&self.zsets, key)?;
        Ok(Self::sorted_zset(&zset)
            .iter()
            .position(|m| m == member)
            .map(|p| p as i64))
    }

    fn zset_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut zset: BTreeMap<String, i64> = Self::get(&self.zsets, key)?;
        let removed = zset.remove(member).is_some();
        if removed {
            Self::put(&self.zsets, key, &zset)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MEMBER_SCORE, OWNER_SCORE};
    use tempfile::TempDir;

    #[test]
    fn set_and_string_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let store = SledStore::open(dir.path())?;

        assert!(store.set_add("Chatroom", "alice")?);
        assert!(store.set_is_member("Chatroom", "alice")?);

        store.string_set("alice", "secret")?;
        assert_eq!(store.string_get("alice")?, Some("secret".to_string()));

        store.key_delete(&["alice"])?;
        assert_eq!(store.string_get("alice")?, None);
        Ok(())
    }

    #[test]
    fn zset_owner_succession() -> Result<()> {
        let dir = TempDir::new()?;
        let store = SledStore::open(dir.path())?;

        store.zset_add("dev", OWNER_SCORE, "alice")?;
        store.zset_add("dev", MEMBER_SCORE, "bob")?;
        assert_eq!(store.zset_range("dev", 0, 0)?, vec!["alice".to_string()]);

        store.zset_remove("dev", "alice")?;
        store.zset_add("dev", OWNER_SCORE, "bob")?;
        assert_eq!(store.zset_range("dev", 0, 0)?, vec!["bob".to_string()]);
        Ok(())
    }

    #[test]
    fn reopen_persists_data() -> Result<()> {
        let dir = TempDir::new()?;
        {
            let store = SledStore::open(dir.path())?;
            store.list_push_right("bob.mail", &["d", "t", "alice", "hi"])?;
        }
        let store = SledStore::open(dir.path())?;
        assert_eq!(
            store.list_range("bob.mail", 0, -1)?,
            vec!["d", "t", "alice", "hi"]
        );
        Ok(())
    }
}
