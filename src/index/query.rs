use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::index::keys::{AddressTxoKey, SpentMarker, TxoRecord};
use crate::runtime::store::KvRead;

/// One output of an address as served by the txo endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AddressTxo {
    pub txhash: String,
    pub vout: u64,
    pub block: u64,
    pub value: u64,
    pub spender: Option<String>,
}

/// Visit every decodable TXO record of `address` in key order together with
/// its raw spent marker, if any. Undecodable records are logged and skipped.
fn for_each_txo<R, F>(store: &R, address: &str, mut f: F) -> Result<usize>
where
    R: KvRead + ?Sized,
    F: FnMut(TxoRecord, Option<Vec<u8>>),
{
    let (start, limit) = AddressTxoKey::scan_bounds(address)?;
    let mut scanned = 0usize;
    store.scan(&start, &limit, &mut |key, value| {
        scanned += 1;
        let record = match TxoRecord::decode(value) {
            Ok(r) => r,
            Err(e) => {
                warn!(
                    "[query] skipping txo {} for {address}: {e}",
                    String::from_utf8_lossy(key)
                );
                return Ok(());
            }
        };
        let marker = store.get(&record.spent_key()?)?;
        f(record, marker);
        Ok(())
    })?;
    Ok(scanned)
}

/// Sum of unspent output values paying `address`.
pub fn get_balance<R: KvRead + ?Sized>(store: &R, address: &str) -> Result<u64> {
    let mut balance = 0u64;
    let count = for_each_txo(store, address, |record, marker| {
        if marker.is_none() {
            balance = balance.saturating_add(record.value);
        }
    })?;
    info!("[query] analyzed {count} txos for {address} - balance is {balance}");
    Ok(balance)
}

/// Outputs of `address` with `block >= since_height`, in creation order.
pub fn get_txos<R: KvRead + ?Sized>(
    store: &R,
    address: &str,
    since_height: u64,
) -> Result<Vec<AddressTxo>> {
    let mut txos = Vec::new();
    let count = for_each_txo(store, address, |record, marker| {
        if record.block_height < since_height {
            return;
        }
        let spender = marker.and_then(|raw| match SpentMarker::decode(&raw) {
            Ok(m) => Some(m.spender),
            Err(e) => {
                warn!("[query] unreadable spent marker for {}:{}: {e}", record.tx_hash, record.vout);
                None
            }
        });
        txos.push(AddressTxo {
            txhash: record.tx_hash,
            vout: record.vout,
            block: record.block_height,
            value: record.value,
            spender,
        });
    })?;
    debug!("[query] {address}: {} of {count} txos at height >= {since_height}", txos.len());
    Ok(txos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IndexerError;
    use crate::test_utils::{IndexFixture, MemStore, hash};

    #[test]
    fn empty_address_has_zero_balance() {
        let store = MemStore::new();
        assert_eq!(get_balance(&store, "Vnobody").unwrap(), 0);
        assert!(get_txos(&store, "Vnobody", 0).unwrap().is_empty());
    }

    #[test]
    fn example_record_counts_until_spent() {
        let store = MemStore::new();
        let mut fx = IndexFixture::new(&store);
        fx.add_txo("Vxyz", &hash('a'), 0, 12345, 500_000);

        assert_eq!(get_balance(&store, "Vxyz").unwrap(), 500_000);
        fx.spend(&hash('a'), 0, &hash('b'));
        assert_eq!(get_balance(&store, "Vxyz").unwrap(), 0);
    }

    #[test]
    fn spent_output_marked_but_still_listed() {
        let store = MemStore::new();
        let mut fx = IndexFixture::new(&store);
        fx.add_txo("Vq", &hash('1'), 1, 10, 7);
        fx.spend(&hash('1'), 1, &hash('2'));

        let txos = get_txos(&store, "Vq", 0).unwrap();
        assert_eq!(txos.len(), 1);
        assert_eq!(txos[0].spender.as_deref(), Some(hash('2').as_str()));
    }

    #[test]
    fn scan_failure_fails_the_query() {
        let store = MemStore::new();
        let mut fx = IndexFixture::new(&store);
        fx.add_txo("Vq", &hash('1'), 0, 10, 7);
        store.fail_scans(true);

        assert!(matches!(get_balance(&store, "Vq"), Err(IndexerError::StoreScan(_))));
        assert!(matches!(get_txos(&store, "Vq", 0), Err(IndexerError::StoreScan(_))));
    }

    #[test]
    fn malformed_record_is_skipped() {
        let store = MemStore::new();
        let mut fx = IndexFixture::new(&store);
        fx.add_txo("Vq", &hash('1'), 0, 10, 7);
        store.insert(b"Vq-txo-00000099".to_vec(), b"garbage".to_vec());

        assert_eq!(get_balance(&store, "Vq").unwrap(), 7);
        assert_eq!(get_txos(&store, "Vq", 0).unwrap().len(), 1);
    }

    #[test]
    fn txo_json_shape() {
        let txo = AddressTxo { txhash: hash('a'), vout: 1, block: 2, value: 3, spender: None };
        let v = serde_json::to_value(&txo).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"txhash": hash('a'), "vout": 1, "block": 2, "value": 3, "spender": null})
        );
    }
}
