//! Descriptor registry.
//!
//! Tracks every open descriptor pair owned by the process (stdin/out,
//! pipe ends, listening socket, per-client socket) with a tag identifying
//! its kind. Used by the pipeline executor to account for every pipe it
//! opens so none are ever leaked past a line's execution, and by the
//! server to report on its listening/client socket counts. Descriptors
//! are tracked with stable integer identity rather than pointer identity.

use log::trace;
use nix::unistd;
use std::{
    collections::HashMap,
    os::unix::io::RawFd,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Pipe,
    ListenSocket,
    ClientSocket,
    ReadFifo,
    WriteFifo,
}

#[derive(Debug, Clone, Copy)]
pub struct DescriptorEntry {
    pub id: u64,
    pub read_fd: Option<RawFd>,
    pub write_fd: Option<RawFd>,
    pub kind: DescriptorKind,
}

/// A bitmask of `DescriptorKind`s, used by `close_all`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindMask(u8);

impl KindMask {
    pub fn of(kinds: &[DescriptorKind]) -> Self {
        let mut mask = 0u8;
        for k in kinds {
            mask |= 1 << (*k as u8);
        }
        KindMask(mask)
    }

    pub fn contains(&self, kind: DescriptorKind) -> bool {
        self.0 & (1 << (kind as u8)) != 0
    }
}

/// A mask covering every pipe/fifo kind, suitable for closing every pipe
/// owned by the process while preserving listen/client sockets.
pub fn pipes_and_fifos() -> KindMask {
    KindMask::of(&[
        DescriptorKind::Pipe,
        DescriptorKind::ReadFifo,
        DescriptorKind::WriteFifo,
    ])
}

#[derive(Default)]
pub struct DescriptorRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, DescriptorEntry>>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(
        &self,
        read_fd: Option<RawFd>,
        write_fd: Option<RawFd>,
        kind: DescriptorKind,
    ) -> DescriptorEntry {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = DescriptorEntry {
            id,
            read_fd,
            write_fd,
            kind,
        };
        self.entries.lock().unwrap().insert(id, entry);
        trace!("tracked descriptor {:?}", entry);
        entry
    }

    /// Closes both fds of `entry` and unlinks it from the registry.
    pub fn close_one(&self, entry: DescriptorEntry) {
        let mut entries = self.entries.lock().unwrap();
        if entries.remove(&entry.id).is_none() {
            return;
        }
        drop(entries);
        close_fd(entry.read_fd);
        if entry.write_fd != entry.read_fd {
            close_fd(entry.write_fd);
        }
        trace!("closed descriptor {}", entry.id);
    }

    /// Closes and unlinks every entry whose kind is set in `mask`.
    pub fn close_all(&self, mask: KindMask) {
        let matching: Vec<DescriptorEntry> = {
            let entries = self.entries.lock().unwrap();
            entries
                .values()
                .filter(|e| mask.contains(e.kind))
                .copied()
                .collect()
        };
        for entry in matching {
            self.close_one(entry);
        }
    }

    /// Returns any entry of the given kind (used by the server to find
    /// its listen socket).
    pub fn get(&self, kind: DescriptorKind) -> Option<DescriptorEntry> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.kind == kind)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn close_fd(fd: Option<RawFd>) {
    if let Some(fd) = fd {
        let _ = unistd::close(fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_close_one() {
        let reg = DescriptorRegistry::new();
        let (r, w) = unistd::pipe().unwrap();
        let entry = reg.track(Some(r), Some(w), DescriptorKind::Pipe);
        assert_eq!(reg.len(), 1);
        reg.close_one(entry);
        assert!(reg.is_empty());
    }

    #[test]
    fn close_all_respects_mask() {
        let reg = DescriptorRegistry::new();
        let (r, w) = unistd::pipe().unwrap();
        reg.track(Some(r), Some(w), DescriptorKind::Pipe);
        reg.track(None, None, DescriptorKind::ClientSocket);

        reg.close_all(pipes_and_fifos());

        assert_eq!(reg.len(), 1);
        assert!(reg.get(DescriptorKind::ClientSocket).is_some());
    }

    #[test]
    fn get_returns_matching_kind() {
        let reg = DescriptorRegistry::new();
        reg.track(None, None, DescriptorKind::ListenSocket);
        assert!(reg.get(DescriptorKind::ListenSocket).is_some());
        assert!(reg.get(DescriptorKind::ClientSocket).is_none());
    }
}
