use rocksdb::{
    BlockBasedOptions, Cache, DB, DBRawIterator, Error as RocksError, IteratorMode, Options,
    ReadOptions, Snapshot, WriteBatch,
};
use std::{path::Path, sync::Arc};
use tracing::{info, warn};

use crate::errors::{IndexerError, Result};
use crate::runtime::store::{KvRead, KvStore};

/// ===== Cache / open-time tuning =====
/// How big you want the LRU block cache (data + index/filter when enabled).
pub const ROCKS_BLOCK_CACHE_BYTES: usize = 512 << 20; // 512 MiB

/// Bloom filter bits/key (helps the spent-marker point lookups).
pub const BLOOM_BITS_PER_KEY: f64 = 10.0;

/// Shared handle to the index RocksDB written by ingestion.
#[derive(Clone)]
pub struct Mdb {
    db: Arc<DB>,
}

impl Mdb {
    pub fn from_db(db: Arc<DB>) -> Self {
        Self { db }
    }

    fn table_options(cache: &Cache) -> BlockBasedOptions {
        let mut table = BlockBasedOptions::default();
        table.set_block_cache(cache);
        // Put index + filter in the cache (hot metadata)
        table.set_cache_index_and_filter_blocks(true);
        table.set_pin_l0_filter_and_index_blocks_in_cache(true);
        table.set_bloom_filter(BLOOM_BITS_PER_KEY, false);
        table
    }

    /// Open (creating if missing). With `warm_cache`, every key is read once
    /// so the first queries hit the block cache.
    pub fn open(path: impl AsRef<Path>, warm_cache: bool) -> Result<Self> {
        let cache = Cache::new_lru_cache(ROCKS_BLOCK_CACHE_BYTES);
        let table = Self::table_options(&cache);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        // Keep readers open (avoid fd thrash)
        opts.set_max_open_files(-1);
        opts.set_block_based_table_factory(&table);

        let mdb = Self::from_db(Arc::new(DB::open(&opts, path)?));
        if warm_cache {
            mdb.warm_up_logged();
        }
        Ok(mdb)
    }

    /// Open next to a running writer. Sees the state as of open time.
    pub fn open_read_only(path: impl AsRef<Path>, warm_cache: bool) -> Result<Self> {
        let cache = Cache::new_lru_cache(ROCKS_BLOCK_CACHE_BYTES);
        let table = Self::table_options(&cache);

        let mut opts = Options::default();
        opts.set_block_based_table_factory(&table);

        let mdb = Self::from_db(Arc::new(DB::open_for_read_only(&opts, path, false)?));
        if warm_cache {
            mdb.warm_up_logged();
        }
        Ok(mdb)
    }

    fn warm_up_logged(&self) {
        match self.warm_up() {
            Ok(n) => info!("[mdb] block cache warmed with {n} keys"),
            // best-effort
            Err(e) => warn!("[mdb] cache warm-up failed: {e}"),
        }
    }

    /// Walk the whole keyspace once to populate the block cache.
    /// Returns the number of KV pairs touched.
    pub fn warm_up(&self) -> std::result::Result<usize, RocksError> {
        let mut ro = ReadOptions::default();
        ro.fill_cache(true);

        let mut count = 0usize;
        for res in self.db.iterator_opt(IteratorMode::Start, ro) {
            res?;
            count += 1;
        }
        Ok(count)
    }

    #[inline]
    pub fn inner_db(&self) -> &DB {
        &self.db
    }

    pub fn put(&self, k: &[u8], v: &[u8]) -> Result<()> {
        self.db.put(k, v)?;
        Ok(())
    }

    pub fn delete(&self, k: &[u8]) -> Result<()> {
        self.db.delete(k)?;
        Ok(())
    }

    pub fn bulk_write<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(&mut WriteBatch),
    {
        let mut wb = WriteBatch::default();
        build(&mut wb);
        self.db.write(wb)?;
        Ok(())
    }

    /// Consistent read view for one request.
    pub fn snapshot(&self) -> MdbSnapshot<'_> {
        MdbSnapshot { snap: self.db.snapshot() }
    }
}

/// Visit `[start, limit)` in key order, then surface any iterator error.
fn walk(
    mut it: DBRawIterator<'_>,
    start: &[u8],
    limit: &[u8],
    visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
) -> Result<()> {
    it.seek(start);
    while it.valid() {
        let (Some(k), Some(v)) = (it.key(), it.value()) else { break };
        if k >= limit {
            break;
        }
        visit(k, v)?;
        it.next();
    }
    it.status().map_err(|e| IndexerError::StoreScan(e.to_string()))
}

impl KvRead for Mdb {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        walk(self.db.raw_iterator(), start, limit, visit)
    }
}

impl KvStore for Mdb {
    fn read_view(&self) -> Box<dyn KvRead + '_> {
        Box::new(self.snapshot())
    }
}

pub struct MdbSnapshot<'a> {
    snap: Snapshot<'a>,
}

impl KvRead for MdbSnapshot<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.snap.get(key)?)
    }

    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        walk(self.snap.raw_iterator(), start, limit, visit)
    }
}
