use std::fmt;

use tracing::{debug, info, warn};

use crate::index::keys::input_origin_key;
use crate::protocols::signatures::{PROTOCOL_SIGNATURES, ProtocolKind, ProtocolSignature, signature_for};
use crate::protocols::{
    MempoolMonitor, ParsedBlock, ParsedTransaction, ProtocolTransaction, ScriptSolver,
};
use crate::runtime::store::KvRead;

/// Why a transaction with a matching output shape was not emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NotSentinel,
    NoInputs,
    OriginNotFound { tx_hash: String, vout: u32 },
    AmbiguousRecipient(usize),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotSentinel => f.write_str("sentinel output does not pay the sentinel address"),
            SkipReason::NoInputs => f.write_str("transaction has no inputs"),
            SkipReason::OriginNotFound { tx_hash, vout } => {
                write!(f, "txo {tx_hash}:{vout} not found in index or mempool")
            }
            SkipReason::AmbiguousRecipient(n) => write!(f, "recipient solves to {n} addresses"),
        }
    }
}

/// Per-block protocol scanner. Holds only borrowed collaborators; every scan
/// is independent.
pub struct Classifier<'a> {
    solver: &'a dyn ScriptSolver,
    mempool: &'a dyn MempoolMonitor,
    sentinel: &'a str,
}

impl<'a> Classifier<'a> {
    pub fn new(
        solver: &'a dyn ScriptSolver,
        mempool: &'a dyn MempoolMonitor,
        sentinel: &'a str,
    ) -> Self {
        Self { solver, mempool, sentinel }
    }

    pub fn parse_esignature_transactions<R: KvRead + ?Sized>(
        &self,
        block: &ParsedBlock,
        store: &R,
    ) -> Vec<ProtocolTransaction> {
        self.scan_block(block, store, &[*signature_for(ProtocolKind::Esignature)])
    }

    pub fn parse_identity_transactions<R: KvRead + ?Sized>(
        &self,
        block: &ParsedBlock,
        store: &R,
    ) -> Vec<ProtocolTransaction> {
        self.scan_block(block, store, &[*signature_for(ProtocolKind::Identity)])
    }

    /// All known protocols in one pass, in block order.
    pub fn classify_block<R: KvRead + ?Sized>(
        &self,
        block: &ParsedBlock,
        store: &R,
    ) -> Vec<ProtocolTransaction> {
        self.scan_block(block, store, PROTOCOL_SIGNATURES)
    }

    fn scan_block<R: KvRead + ?Sized>(
        &self,
        block: &ParsedBlock,
        store: &R,
        signatures: &[ProtocolSignature],
    ) -> Vec<ProtocolTransaction> {
        let mut found = Vec::new();
        for tx in &block.transactions {
            for sig in signatures.iter().filter(|s| s.matches_shape(tx)) {
                match self.resolve(sig, tx, block, store) {
                    Ok(ptx) => {
                        found.push(ptx);
                        break;
                    }
                    Err(SkipReason::NotSentinel) => continue,
                    Err(reason @ SkipReason::OriginNotFound { .. }) => {
                        warn!("[classifier] {} tx {}: {reason}", sig.kind.as_str(), tx.tx_hash);
                        break;
                    }
                    Err(reason) => {
                        debug!("[classifier] {} tx {}: {reason}", sig.kind.as_str(), tx.tx_hash);
                        break;
                    }
                }
            }
        }
        if !found.is_empty() {
            info!("[classifier] block {}: {} protocol transactions", block.height, found.len());
        }
        found
    }

    fn single_address(&self, script: &[u8]) -> Result<String, usize> {
        let mut addrs = self.solver.get_addresses_from_script(script);
        if addrs.len() == 1 { Ok(addrs.remove(0)) } else { Err(addrs.len()) }
    }

    fn resolve<R: KvRead + ?Sized>(
        &self,
        sig: &ProtocolSignature,
        tx: &ParsedTransaction,
        block: &ParsedBlock,
        store: &R,
    ) -> Result<ProtocolTransaction, SkipReason> {
        if let Some(idx) = sig.sentinel_output {
            match self.single_address(&tx.outputs[idx].script) {
                Ok(addr) if addr == self.sentinel => {}
                _ => return Err(SkipReason::NotSentinel),
            }
        }

        let Some(input) = tx.inputs.first() else {
            return Err(SkipReason::NoInputs);
        };
        let Some(from_address) = self.origin_address(store, &input.tx_hash, input.vout) else {
            return Err(SkipReason::OriginNotFound {
                tx_hash: input.tx_hash.clone(),
                vout: input.vout,
            });
        };

        let to_address = match self.single_address(&tx.outputs[sig.recipient_output].script) {
            Ok(a) => a,
            Err(n) => return Err(SkipReason::AmbiguousRecipient(n)),
        };

        Ok(ProtocolTransaction {
            kind: sig.kind,
            from_address,
            to_address,
            script: tx.outputs[sig.payload_output].script.clone(),
            tx_id: tx.tx_hash.clone(),
            time: block.time,
            height: block.height,
        })
    }

    /// Owner of `tx_hash:vout` from the index, falling back to the mempool.
    ///
    /// A failed index read counts as "not indexed yet".
    fn origin_address<R: KvRead + ?Sized>(
        &self,
        store: &R,
        tx_hash: &str,
        vout: u32,
    ) -> Option<String> {
        // vouts wider than the key field (coinbase 0xffffffff) are never indexed
        if let Ok(key) = input_origin_key(tx_hash, u64::from(vout)) {
            match store.get(&key) {
                Ok(Some(raw)) => return Some(String::from_utf8_lossy(&raw).into_owned()),
                Ok(None) => {}
                Err(e) => warn!("[classifier] origin lookup {tx_hash}:{vout} failed: {e}"),
            }
        }
        self.mempool.get_txo_address(tx_hash, vout).filter(|a| !a.is_empty())
    }
}
