use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::{IndexerError, Result};
use crate::runtime::store::{KvRead, KvStore};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

fn scan_map(
    map: &Map,
    start: &[u8],
    limit: &[u8],
    visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
) -> Result<()> {
    if start >= limit {
        return Ok(());
    }
    let range = (Bound::Included(start.to_vec()), Bound::Excluded(limit.to_vec()));
    for (k, v) in map.range::<Vec<u8>, _>(range) {
        visit(k, v)?;
    }
    Ok(())
}

/// In-memory ordered store with the same scan contract as RocksDB.
///
/// `fail_scans(true)` makes every range scan end in `StoreScan`, which is how
/// a RocksDB iterator reports I/O or corruption after the walk.
#[derive(Default)]
pub struct MemStore {
    map: RwLock<Map>,
    fail: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        self.map.write().expect("mem store poisoned").insert(key, value);
    }

    pub fn remove(&self, key: &[u8]) {
        self.map.write().expect("mem store poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.map.read().expect("mem store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_scans(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn injected_failure(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexerError::StoreScan("injected iterator failure".into()));
        }
        Ok(())
    }
}

impl KvRead for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().expect("mem store poisoned").get(key).cloned())
    }

    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        self.injected_failure()?;
        // visitors do point lookups on the same store; don't hold the lock
        let view = self.map.read().expect("mem store poisoned").clone();
        scan_map(&view, start, limit, visit)
    }
}

/// Frozen copy of a [`MemStore`] taken by `read_view`.
pub struct MemSnapshot {
    map: Map,
    fail: bool,
}

impl KvRead for MemSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        if self.fail {
            return Err(IndexerError::StoreScan("injected iterator failure".into()));
        }
        scan_map(&self.map, start, limit, visit)
    }
}

impl KvStore for MemStore {
    fn read_view(&self) -> Box<dyn KvRead + '_> {
        Box::new(MemSnapshot {
            map: self.map.read().expect("mem store poisoned").clone(),
            fail: self.fail.load(Ordering::SeqCst),
        })
    }
}
