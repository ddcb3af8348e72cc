use std::collections::HashMap;

use serde_json::Value;

use crate::bitcoind_flexible::{RPC_INVALID_ADDRESS_OR_KEY, TransactionLookup};
use crate::errors::{IndexerError, Result};
use crate::protocols::{MempoolMonitor, ScriptSolver};

/// Script solver answering from a fixed script -> addresses table.
/// Unknown scripts solve to nothing.
#[derive(Default)]
pub struct StaticScriptSolver {
    table: HashMap<Vec<u8>, Vec<String>>,
}

impl StaticScriptSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, script: &[u8], addresses: &[&str]) -> Self {
        self.table
            .insert(script.to_vec(), addresses.iter().map(|a| a.to_string()).collect());
        self
    }
}

impl ScriptSolver for StaticScriptSolver {
    fn get_addresses_from_script(&self, script: &[u8]) -> Vec<String> {
        self.table.get(script).cloned().unwrap_or_default()
    }
}

/// Mempool with a fixed set of unconfirmed outputs.
#[derive(Default)]
pub struct StaticMempool {
    txos: HashMap<(String, u32), String>,
}

impl StaticMempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tx_hash: &str, vout: u32, address: &str) -> Self {
        self.txos.insert((tx_hash.to_string(), vout), address.to_string());
        self
    }
}

impl MempoolMonitor for StaticMempool {
    fn get_txo_address(&self, tx_hash: &str, vout: u32) -> Option<String> {
        self.txos.get(&(tx_hash.to_string(), vout)).cloned()
    }
}

/// Node that knows a fixed set of verbose transactions and answers the rest
/// the way vertcoind does.
#[derive(Default)]
pub struct StaticNode {
    txs: HashMap<String, Value>,
}

impl StaticNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tx(mut self, txid: &str, verbose: Value) -> Self {
        self.txs.insert(txid.to_string(), verbose);
        self
    }
}

impl TransactionLookup for StaticNode {
    fn get_raw_transaction_verbose(&self, txid: &str) -> Result<Value> {
        self.txs.get(txid).cloned().ok_or_else(|| IndexerError::Rpc {
            code: RPC_INVALID_ADDRESS_OR_KEY,
            message: "No such mempool or blockchain transaction. Use gettransaction for wallet transactions."
                .to_string(),
        })
    }
}
