//! Inode numbers for an inode-addressed transport.
//!
//! The fixed tree has fixed numbers. Unicode leaves are numbered when the
//! kernel looks them up and dropped again once it forgets every lookup.

use alloc::{collections::BTreeMap, string::String};
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

pub const ROOT_INO: u64 = 1;

const FIXED: [(u64, &str); 6] = [
    (ROOT_INO, "/"),
    (2, "/alpha"),
    (3, "/numeric"),
    (4, "/unicode"),
    (5, "/alpha/data"),
    (6, "/numeric/data"),
];

const FIRST_DYNAMIC_INO: u64 = 7;

struct Node {
    path: String,
    /// Outstanding kernel lookups; unused for fixed nodes.
    lookups: u64,
}

#[derive(Default)]
struct Maps {
    by_ino: BTreeMap<u64, Node>,
    by_path: BTreeMap<String, u64>,
}

impl Maps {
    fn insert(&mut self, ino: u64, path: &str) {
        self.by_ino.insert(
            ino,
            Node {
                path: String::from(path),
                lookups: 0,
            },
        );
        self.by_path.insert(String::from(path), ino);
    }
}

pub struct InodeTable {
    maps: Mutex<Maps>,
    next_ino: AtomicU64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut maps = Maps::default();
        for (ino, path) in FIXED {
            maps.insert(ino, path);
        }
        Self {
            maps: Mutex::new(maps),
            next_ino: AtomicU64::new(FIRST_DYNAMIC_INO),
        }
    }

    /// Path registered for `ino`.
    pub fn path(&self, ino: u64) -> Option<String> {
        self.maps.lock().by_ino.get(&ino).map(|node| node.path.clone())
    }

    /// Inode number for `path`, allocating one if the path is new.
    ///
    /// Does not count as a kernel lookup.
    pub fn ino_for(&self, path: &str) -> u64 {
        let mut maps = self.maps.lock();
        if let Some(&ino) = maps.by_path.get(path) {
            return ino;
        }
        let ino = self.next_ino.fetch_add(1, Ordering::SeqCst);
        maps.insert(ino, path);
        ino
    }

    /// Like [`Self::ino_for`], and records one kernel lookup of the node.
    pub fn remember(&self, path: &str) -> u64 {
        let ino = self.ino_for(path);
        if let Some(node) = self.maps.lock().by_ino.get_mut(&ino) {
            node.lookups += 1;
        }
        ino
    }

    /// Drop `nlookup` lookups of `ino`. A dynamic node with none left is
    /// removed; fixed nodes always stay.
    pub fn forget(&self, ino: u64, nlookup: u64) {
        if ino < FIRST_DYNAMIC_INO {
            return;
        }
        let mut maps = self.maps.lock();
        let Some(node) = maps.by_ino.get_mut(&ino) else {
            return;
        };
        node.lookups = node.lookups.saturating_sub(nlookup);
        if node.lookups == 0 {
            if let Some(node) = maps.by_ino.remove(&ino) {
                maps.by_path.remove(&node.path);
            }
        }
    }

    /// Inode number for `path` if one has been handed out.
    pub fn lookup(&self, path: &str) -> Option<u64> {
        self.maps.lock().by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.maps.lock().by_ino.len()
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_numbers() {
        let table = InodeTable::new();
        assert_eq!(table.path(ROOT_INO).as_deref(), Some("/"));
        assert_eq!(table.lookup("/numeric/data"), Some(6));
        assert_eq!(table.ino_for("/alpha"), 2);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_dynamic_numbers_are_stable() {
        let table = InodeTable::new();
        let a = table.remember("/unicode/41");
        let b = table.remember("/unicode/1F600");
        assert_eq!(a, FIRST_DYNAMIC_INO);
        assert_eq!(b, FIRST_DYNAMIC_INO + 1);
        assert_eq!(table.remember("/unicode/41"), a);
        assert_eq!(table.path(b).as_deref(), Some("/unicode/1F600"));
        assert_eq!(table.path(99), None);
    }

    #[test]
    fn test_forget_evicts_dynamic_nodes() {
        let table = InodeTable::new();
        let spellings = ["/unicode/41", "/unicode/041", "/unicode/U+41", "/unicode/0x41"];
        let inos: Vec<u64> = spellings.iter().map(|p| table.remember(p)).collect();
        table.remember("/unicode/41");
        assert_eq!(table.len(), 10);

        for ino in &inos[1..] {
            table.forget(*ino, 1);
        }
        assert_eq!(table.len(), 7);
        assert_eq!(table.lookup("/unicode/U+41"), None);

        // two lookups of "/unicode/41" are outstanding
        table.forget(inos[0], 1);
        assert_eq!(table.path(inos[0]).as_deref(), Some("/unicode/41"));
        table.forget(inos[0], 1);
        assert_eq!(table.path(inos[0]), None);
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_forget_keeps_fixed_nodes() {
        let table = InodeTable::new();
        table.remember("/alpha/data");
        table.forget(5, 10);
        table.forget(ROOT_INO, 1);
        table.forget(1234, 1);
        assert_eq!(table.len(), 6);
        assert_eq!(table.lookup("/alpha/data"), Some(5));
    }
}
