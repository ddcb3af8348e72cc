//! Minimal stand-in for the ingestion writer.
//!
//! Writes the same records ingestion would for a block's outputs and spends,
//! so query and classifier tests run against realistic store contents.

use std::collections::HashMap;

use crate::index::keys::{AddressTxoKey, FIRST_SEQUENCE, SpentMarker, TxoRecord, input_origin_key};
use crate::runtime::mdb::Mdb;
use crate::test_utils::MemStore;

/// Anything a fixture can write raw pairs into.
pub trait IndexSink {
    fn put_raw(&self, key: &[u8], value: &[u8]);
}

impl IndexSink for MemStore {
    fn put_raw(&self, key: &[u8], value: &[u8]) {
        self.insert(key.to_vec(), value.to_vec());
    }
}

impl IndexSink for Mdb {
    fn put_raw(&self, key: &[u8], value: &[u8]) {
        self.put(key, value).expect("fixture write to rocksdb");
    }
}

/// Sequences are assigned per address, starting at 1, in call order.
pub struct IndexFixture<'a, S: IndexSink + ?Sized> {
    sink: &'a S,
    next_seq: HashMap<String, u64>,
}

impl<'a, S: IndexSink + ?Sized> IndexFixture<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink, next_seq: HashMap::new() }
    }

    /// Record output `tx_hash:vout` paying `value` to `address` at `height`.
    /// Also writes the input-origin entry the classifier resolves senders from.
    pub fn add_txo(
        &mut self,
        address: &str,
        tx_hash: &str,
        vout: u64,
        height: u64,
        value: u64,
    ) -> &mut Self {
        let seq = self.next_seq.entry(address.to_string()).or_insert(FIRST_SEQUENCE);
        let key = AddressTxoKey::new(address, *seq).encode().expect("fixture sequence fits");
        *seq += 1;

        let record = TxoRecord { tx_hash: tx_hash.to_string(), vout, block_height: height, value };
        self.sink.put_raw(&key, &record.encode().expect("fixture record encodes"));
        self.sink.put_raw(
            &input_origin_key(tx_hash, vout).expect("fixture vout fits"),
            address.as_bytes(),
        );
        self
    }

    /// Mark `tx_hash:vout` spent by `spender`.
    pub fn spend(&mut self, tx_hash: &str, vout: u64, spender: &str) -> &mut Self {
        let record =
            TxoRecord { tx_hash: tx_hash.to_string(), vout, block_height: 0, value: 0 };
        let key = record.spent_key().expect("fixture vout fits");
        let spending_input = format!("{spender}{:08}", 0);
        self.sink.put_raw(&key, &SpentMarker::encode(&spending_input, spender));
        self
    }

    /// Only the input-origin entry, for outputs whose owner is known but whose
    /// listing is irrelevant to the test.
    pub fn add_origin(&mut self, tx_hash: &str, vout: u64, address: &str) -> &mut Self {
        self.sink.put_raw(
            &input_origin_key(tx_hash, vout).expect("fixture vout fits"),
            address.as_bytes(),
        );
        self
    }
}
