//! Application protocols embedded in ordinary transactions.
//!
//! A protocol transaction has exactly four outputs whose values and script
//! prefixes match a [`signatures::ProtocolSignature`]. The classifier resolves
//! the sender from the first input's previous output and the recipient from the
//! marker output.

pub mod classifier;
pub mod signatures;
pub mod solver;

use bitcoin::Block;
use serde::Serialize;

pub use classifier::{Classifier, SkipReason};
pub use signatures::{PROTOCOL_SIGNATURES, ProtocolKind, ProtocolSignature};
pub use solver::StandardScriptSolver;

/// Turns an output script into the addresses it pays.
pub trait ScriptSolver: Send + Sync {
    fn get_addresses_from_script(&self, script: &[u8]) -> Vec<String>;
}

/// Unconfirmed-output lookup used when an input's origin is not indexed yet.
pub trait MempoolMonitor: Send + Sync {
    fn get_txo_address(&self, tx_hash: &str, vout: u32) -> Option<String>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub tx_hash: String,
    pub vout: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub tx_hash: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedBlock {
    pub height: u64,
    pub time: u64,
    pub transactions: Vec<ParsedTransaction>,
}

impl ParsedTransaction {
    pub fn from_bitcoin(tx: &bitcoin::Transaction) -> Self {
        Self {
            tx_hash: tx.compute_txid().to_string(),
            inputs: tx
                .input
                .iter()
                .map(|i| TxInput {
                    tx_hash: i.previous_output.txid.to_string(),
                    vout: i.previous_output.vout,
                })
                .collect(),
            outputs: tx
                .output
                .iter()
                .map(|o| TxOutput { value: o.value.to_sat(), script: o.script_pubkey.to_bytes() })
                .collect(),
        }
    }
}

impl ParsedBlock {
    pub fn from_bitcoin(block: &Block, height: u64) -> Self {
        Self {
            height,
            time: u64::from(block.header.time),
            transactions: block.txdata.iter().map(ParsedTransaction::from_bitcoin).collect(),
        }
    }
}

/// A detected protocol transaction. Not persisted by the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtocolTransaction {
    pub kind: ProtocolKind,
    pub from_address: String,
    pub to_address: String,
    #[serde(with = "hex_bytes")]
    pub script: Vec<u8>,
    pub tx_id: String,
    pub time: u64,
    pub height: u64,
}

pub type EsignatureTransaction = ProtocolTransaction;
pub type IdentityTransaction = ProtocolTransaction;

mod hex_bytes {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }
}
