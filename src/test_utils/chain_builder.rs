use std::str::FromStr;

use bitcoin::script::ScriptBuf;
use bitcoin::{
    Amount, Block, BlockHash, CompactTarget, OutPoint, Sequence, Transaction, TxIn, TxMerkleNode,
    TxOut, Txid, Witness,
    block::{Header, Version},
    hashes::Hash,
};

use crate::consts::{IDENTITY_PREFIX, OP_RETURN, PROTOCOL_MARKER_VALUE};

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut s = vec![0x76, 0xa9, 0x14];
    s.extend_from_slice(hash);
    s.extend_from_slice(&[0x88, 0xac]);
    s
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_script(hash: &[u8; 20]) -> Vec<u8> {
    let mut s = vec![0xa9, 0x14];
    s.extend_from_slice(hash);
    s.push(0x87);
    s
}

fn push_data(s: &mut Vec<u8>, data: &[u8]) {
    assert!(data.len() < 0x4c, "fixture payloads are direct pushes");
    s.push(data.len() as u8);
    s.extend_from_slice(data);
}

/// Builder for one transaction of a test block.
pub struct TxBuilder {
    tx: Transaction,
}

impl TxBuilder {
    pub fn new() -> Self {
        Self {
            tx: Transaction {
                version: bitcoin::transaction::Version::TWO,
                lock_time: bitcoin::locktime::absolute::LockTime::ZERO,
                input: vec![],
                output: vec![],
            },
        }
    }

    /// Spend `txid:vout`; `txid` in display (RPC) hex.
    pub fn input(mut self, txid: &str, vout: u32) -> Self {
        let txid = Txid::from_str(txid).expect("fixture txid is 64 hex chars");
        self.tx.input.push(TxIn {
            previous_output: OutPoint { txid, vout },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        self
    }

    pub fn output(mut self, value: u64, script: Vec<u8>) -> Self {
        self.tx
            .output
            .push(TxOut { value: Amount::from_sat(value), script_pubkey: ScriptBuf::from_bytes(script) });
        self
    }

    /// The four outputs of a document signature: change, marker to the
    /// recipient, `OP_RETURN <doc>`, payment to `sentinel_script`.
    pub fn esignature(self, recipient_script: Vec<u8>, doc: &[u8], sentinel_script: Vec<u8>) -> Self {
        let mut payload = vec![OP_RETURN];
        push_data(&mut payload, doc);
        self.output(50_000, p2pkh_script(&[0xcc; 20]))
            .output(PROTOCOL_MARKER_VALUE, recipient_script)
            .output(0, payload)
            .output(1_000, sentinel_script)
    }

    /// The four outputs of an identity attestation: change, marker to the
    /// recipient, `OP_RETURN "IDEN"`, `OP_RETURN <data>`.
    pub fn identity(self, recipient_script: Vec<u8>, data: &[u8]) -> Self {
        let mut payload = vec![OP_RETURN];
        push_data(&mut payload, data);
        self.output(50_000, p2pkh_script(&[0xcc; 20]))
            .output(PROTOCOL_MARKER_VALUE, recipient_script)
            .output(0, IDENTITY_PREFIX.to_vec())
            .output(0, payload)
    }

    pub fn build(self) -> Transaction {
        self.tx
    }
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a single block: a coinbase followed by the pushed transactions.
pub struct BlockBuilder {
    height: u32,
    time: u32,
    txs: Vec<Transaction>,
}

impl BlockBuilder {
    pub fn new(height: u32, time: u32) -> Self {
        Self { height, time, txs: vec![Self::create_coinbase_tx(height)] }
    }

    pub fn tx(mut self, tx: Transaction) -> Self {
        self.txs.push(tx);
        self
    }

    pub fn build(self) -> Block {
        let mut block = Block {
            header: Header {
                version: Version::from_consensus(0x2000_0000),
                prev_blockhash: BlockHash::all_zeros(),
                merkle_root: TxMerkleNode::all_zeros(),
                time: self.time,
                bits: CompactTarget::from_consensus(0x207fffff),
                nonce: self.height,
            },
            txdata: self.txs,
        };
        if let Some(root) = block.compute_merkle_root() {
            block.header.merkle_root = root;
        }
        block
    }

    fn create_coinbase_tx(height: u32) -> Transaction {
        // BIP34 height push
        let mut height_script = vec![0x03];
        height_script.extend_from_slice(&height.to_le_bytes()[..3]);

        Transaction {
            version: bitcoin::transaction::Version::TWO,
            lock_time: bitcoin::locktime::absolute::LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(height_script),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(25 * 100_000_000),
                script_pubkey: ScriptBuf::from_bytes(p2pkh_script(&[0xee; 20])),
            }],
        }
    }
}
