//! In-memory `Store` implementation, used by handler and session unit
//! tests in place of a `sled`-backed database.

use super::{resolve_range, Store};
use anyhow::Result;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Mutex,
};

#[derive(Default)]
struct Tables {
    sets: HashMap<String, HashSet<String>>,
    lists: HashMap<String, Vec<String>>,
    zsets: HashMap<String, BTreeMap<String, i64>>,
    strings: HashMap<String, String>,
}

/// A `Store` backed entirely by in-process collections.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_zset(zset: &BTreeMap<String, i64>) -> Vec<String> {
        let mut members: Vec<_> = zset.iter().map(|(m, s)| (m.clone(), *s)).collect();
        members.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        members.into_iter().map(|(m, _)| m).collect()
    }
}

impl Store for MemoryStore {
    fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.sets.entry(key.to_string()).or_default().insert(member.to_string()))
    }

    fn set_is_member(&self, key: &str, member: &str) -> Result<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.sets.get(key).map_or(false, |s| s.contains(member)))
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let t = self.tables.lock().unwrap();
        Ok(t.sets.get(key).map_or_else(Vec::new, |s| s.iter().cloned().collect()))
    }

    fn set_diff(&self, a: &str, b: &str) -> Result<Vec<String>> {
        let t = self.tables.lock().unwrap();
        let empty = HashSet::new();
        let sa = t.sets.get(a).unwrap_or(&empty);
        let sb = t.sets.get(b).unwrap_or(&empty);
        Ok(sa.difference(sb).cloned().collect())
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.sets.get_mut(key).map_or(false, |s| s.remove(member)))
    }

    fn string_get(&self, key: &str) -> Result<Option<String>> {
        let t = self.tables.lock().unwrap();
        Ok(t.strings.get(key).cloned())
    }

    fn string_set(&self, key: &str, value: &str) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        t.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn key_delete(&self, keys: &[&str]) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        for key in keys {
            t.sets.remove(*key);
            t.lists.remove(*key);
            t.zsets.remove(*key);
            t.strings.remove(*key);
        }
        Ok(())
    }

    fn list_push_right(&self, key: &str, elems: &[&str]) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        let list = t.lists.entry(key.to_string()).or_default();
        list.extend(elems.iter().map(|e| e.to_string()));
        Ok(())
    }

    fn list_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let t = self.tables.lock().unwrap();
        let list = match t.lists.get(key) {
            Some(l) => l,
            None => return Ok(vec![]),
        };
        let (s, e) = resolve_range(list.len(), start, stop);
        Ok(list[s..e].to_vec())
    }

    fn list_set(&self, key: &str, index: i64, value: &str) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(list) = t.lists.get_mut(key) {
            if index >= 0 && (index as usize) < list.len() {
                list[index as usize] = value.to_string();
            }
        }
        Ok(())
    }

    fn list_remove(&self, key: &str, count: i64, value: &str) -> Result<i64> {
        let mut t = self.tables.lock().unwrap();
        let list = match t.lists.get_mut(key) {
            Some(l) => l,
            None => return Ok(0),
        };
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
        *list = kept;
        Ok(removed)
    }

    fn zset_add(&self, key: &str, score: i64, member: &str) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let zset = t.zsets.entry(key.to_string()).or_default();
        Ok(zset.insert(member.to_string(), score).is_none())
    }

    fn zset_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>> {
        let t = self.tables.lock().unwrap();
        let zset = match t.zsets.get(key) {
            Some(z) => z,
            None => return Ok(vec![]),
        };
        let members = Self::sorted_zset(zset);
        let (s, e) = resolve_range(members.len(), start, stop);
        Ok(members[s..e].to_vec())
    }

    fn zset_rank(&self, key: &str, member: &str) -> Result<Option<i64>> {
        let t = self.tables.lock().unwrap();
        let zset = match t.zsets.get(key) {
            Some(z) => z,
            None => return Ok(None),
        };
        Ok(Self::sorted_zset(zset)
            .iter()
            .position(|m| m == member)
            .map(|p| p as i64))
    }

    fn zset_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        Ok(t.zsets.get_mut(key).map_or(false, |z| z.remove(member).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MEMBER_SCORE, OWNER_SCORE};

    #[test]
    fn set_roundtrip() -> Result<()> {
        let s = MemoryStore::new();
        assert!(s.set_add("Chatroom", "alice")?);
        assert!(!s.set_add("Chatroom", "alice")?);
        assert!(s.set_is_member("Chatroom", "alice")?);
        assert!(s.set_remove("Chatroom", "alice")?);
        assert!(!s.set_is_member("Chatroom", "alice")?);
        Ok(())
    }

    #[test]
    fn set_diff_offline_users() -> Result<()> {
        let s = MemoryStore::new();
        s.set_add("Chatroom", "alice")?;
        s.set_add("Chatroom", "bob")?;
        s.set_add("Chatroom.online", "alice")?;
        let offline = s.set_diff("Chatroom", "Chatroom.online")?;
        assert_eq!(offline, vec!["bob".to_string()]);
        Ok(())
    }

    #[test]
    fn zset_owner_is_rank_zero() -> Result<()> {
        let s = MemoryStore::new();
        s.zset_add("dev", OWNER_SCORE, "alice")?;
        s.zset_add("dev", MEMBER_SCORE, "bob")?;
        assert_eq!(s.zset_range("dev", 0, 0)?, vec!["alice".to_string()]);
        assert_eq!(s.zset_rank("dev", "bob")?, Some(1));
        Ok(())
    }

    #[test]
    fn list_remove_sentinel() -> Result<()> {
        let s = MemoryStore::new();
        s.list_push_right("bob.mail", &["2024-01-01", "10:00:00", "alice", "hi"])?;
        s.list_set("bob.mail", 3, "__deleted__")?;
        s.list_set("bob.mail", 2, "__deleted__")?;
        s.list_set("bob.mail", 1, "__deleted__")?;
        s.list_set("bob.mail", 0, "__deleted__")?;
        let removed = s.list_remove("bob.mail", 4, "__deleted__")?;
        assert_eq!(removed, 4);
        assert!(s.list_range("bob.mail", 0, -1)?.is_empty());
        Ok(())
    }
}
