use crate::errors::Result;

/// Read access to the ordered key-value store.
///
/// One value of an implementor is one consistent view: the range scan and the
/// point lookups a query makes through it observe the same store state.
pub trait KvRead {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Visit every pair with `start <= key < limit` in ascending key order.
    ///
    /// A visitor error stops the scan and is returned as-is. A failed iterator
    /// status after the walk is returned as `IndexerError::StoreScan`.
    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()>;
}

/// A shared store that hands out per-request read views.
pub trait KvStore: Send + Sync {
    fn read_view(&self) -> Box<dyn KvRead + '_>;
}

impl<T: KvRead + ?Sized> KvRead for &T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn scan(
        &self,
        start: &[u8],
        limit: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>,
    ) -> Result<()> {
        (**self).scan(start, limit, visit)
    }
}
