//! Key and value layouts shared with the ingestion writer.
//!
//! All layouts are ASCII text. Numeric fields are zero-padded decimal of fixed
//! width [`SEQ_WIDTH`]; a wider number is rejected at encode time since it would
//! break the key order that range scans rely on.
//!
//! | record          | key                                           | value                         |
//! |-----------------|-----------------------------------------------|-------------------------------|
//! | address TXO     | `{address}-txo-{seq:08}`                      | [`TxoRecord`]                 |
//! | spent marker    | `txo-{txhash}-{vout:08}-spent`                | [`SpentMarker`]               |
//! | input origin    | `{txhash}{vout:08}`                           | owning address                |

use std::cmp::Ordering;

use crate::errors::{IndexerError, Result};

pub const TX_HASH_LEN: usize = 64;
pub const SEQ_WIDTH: usize = 8;
pub const MAX_FIXED: u64 = 99_999_999;

pub const ADDRESS_TXO_INFIX: &[u8] = b"-txo-";
pub const SPENT_PREFIX: &[u8] = b"txo-";
pub const SPENT_SUFFIX: &[u8] = b"-spent";

/// First and one-past-last sequence covered by an address scan.
pub const FIRST_SEQUENCE: u64 = 1;
pub const SCAN_LIMIT_SEQUENCE: u64 = MAX_FIXED;

const VOUT_OFFSET: usize = TX_HASH_LEN;
const HEIGHT_OFFSET: usize = VOUT_OFFSET + SEQ_WIDTH;
const VALUE_OFFSET: usize = HEIGHT_OFFSET + SEQ_WIDTH;

/// Offset of the spender txid inside a [`SpentMarker`] value.
pub const SPENDER_OFFSET: usize = 64;
pub const SPENDER_MAX_END: usize = SPENDER_OFFSET + 128;

fn push_fixed(out: &mut Vec<u8>, n: u64, what: &str) -> Result<()> {
    if n > MAX_FIXED {
        return Err(IndexerError::MalformedInput(format!(
            "{what} {n} does not fit {SEQ_WIDTH} digits"
        )));
    }
    out.extend_from_slice(format!("{n:0width$}", width = SEQ_WIDTH).as_bytes());
    Ok(())
}

fn parse_fixed(field: &[u8], what: &str) -> Result<u64> {
    if field.len() != SEQ_WIDTH || !field.iter().all(u8::is_ascii_digit) {
        return Err(IndexerError::MalformedInput(format!(
            "{what} is not {SEQ_WIDTH} decimal digits"
        )));
    }
    Ok(field.iter().fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0')))
}

fn check_tx_hash(tx_hash: &str) -> Result<()> {
    if tx_hash.len() != TX_HASH_LEN || !tx_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IndexerError::MalformedInput(format!("bad tx hash {tx_hash:?}")));
    }
    Ok(())
}

/// `{address}-txo-{sequence:08}`.
///
/// Ordering is (address bytes, sequence), which is exactly the byte order of
/// the encoded key for sequences within the fixed width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressTxoKey {
    pub address: String,
    pub sequence: u64,
}

impl AddressTxoKey {
    pub fn new(address: impl Into<String>, sequence: u64) -> Self {
        Self { address: address.into(), sequence }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out =
            Vec::with_capacity(self.address.len() + ADDRESS_TXO_INFIX.len() + SEQ_WIDTH);
        out.extend_from_slice(self.address.as_bytes());
        out.extend_from_slice(ADDRESS_TXO_INFIX);
        push_fixed(&mut out, self.sequence, "sequence")?;
        Ok(out)
    }

    pub fn decode(key: &[u8]) -> Result<Self> {
        let tail = ADDRESS_TXO_INFIX.len() + SEQ_WIDTH;
        if key.len() <= tail {
            return Err(IndexerError::MalformedInput("address txo key too short".into()));
        }
        let (addr, rest) = key.split_at(key.len() - tail);
        if &rest[..ADDRESS_TXO_INFIX.len()] != ADDRESS_TXO_INFIX {
            return Err(IndexerError::MalformedInput("missing -txo- infix".into()));
        }
        let sequence = parse_fixed(&rest[ADDRESS_TXO_INFIX.len()..], "sequence")?;
        let address = String::from_utf8(addr.to_vec())
            .map_err(|_| IndexerError::MalformedInput("address is not utf-8".into()))?;
        Ok(Self { address, sequence })
    }

    /// Half-open `[start, limit)` covering every TXO of `address`.
    pub fn scan_bounds(address: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((
            Self::new(address, FIRST_SEQUENCE).encode()?,
            Self::new(address, SCAN_LIMIT_SEQUENCE).encode()?,
        ))
    }
}

impl Ord for AddressTxoKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address
            .as_bytes()
            .cmp(other.address.as_bytes())
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for AddressTxoKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Output paying an address: `{txhash:64}{vout:08}{height:08}{value}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxoRecord {
    pub tx_hash: String,
    pub vout: u64,
    pub block_height: u64,
    pub value: u64,
}

impl TxoRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        check_tx_hash(&self.tx_hash)?;
        let mut out = Vec::with_capacity(VALUE_OFFSET + 20);
        out.extend_from_slice(self.tx_hash.as_bytes());
        push_fixed(&mut out, self.vout, "vout")?;
        push_fixed(&mut out, self.block_height, "block height")?;
        out.extend_from_slice(self.value.to_string().as_bytes());
        Ok(out)
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() <= VALUE_OFFSET {
            return Err(IndexerError::MalformedInput(format!(
                "txo record is {} bytes, need more than {VALUE_OFFSET}",
                raw.len()
            )));
        }
        let tx_hash = std::str::from_utf8(&raw[..VOUT_OFFSET])
            .map_err(|_| IndexerError::MalformedInput("tx hash is not utf-8".into()))?
            .to_string();
        check_tx_hash(&tx_hash)?;

        let vout = parse_fixed(&raw[VOUT_OFFSET..HEIGHT_OFFSET], "vout")?;
        let block_height = parse_fixed(&raw[HEIGHT_OFFSET..VALUE_OFFSET], "block height")?;
        let value = std::str::from_utf8(&raw[VALUE_OFFSET..])
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| IndexerError::MalformedInput("txo value is not a decimal".into()))?;

        Ok(Self { tx_hash, vout, block_height, value })
    }

    pub fn spent_key(&self) -> Result<Vec<u8>> {
        spent_marker_key(&self.tx_hash, self.vout)
    }
}

/// `txo-{txhash}-{vout:08}-spent`
pub fn spent_marker_key(tx_hash: &str, vout: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(
        SPENT_PREFIX.len() + tx_hash.len() + 1 + SEQ_WIDTH + SPENT_SUFFIX.len(),
    );
    out.extend_from_slice(SPENT_PREFIX);
    out.extend_from_slice(tx_hash.as_bytes());
    out.push(b'-');
    push_fixed(&mut out, vout, "vout")?;
    out.extend_from_slice(SPENT_SUFFIX);
    Ok(out)
}

/// `{txhash}{vout:08}`, the key under which the owning address of an output
/// is stored.
pub fn input_origin_key(tx_hash: &str, vout: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(tx_hash.len() + SEQ_WIDTH);
    out.extend_from_slice(tx_hash.as_bytes());
    push_fixed(&mut out, vout, "vout")?;
    Ok(out)
}

/// Value of a spent marker: 64 bytes of spending-input data, then the spender
/// txid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpentMarker {
    pub spender: String,
}

impl SpentMarker {
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() <= SPENDER_OFFSET {
            return Err(IndexerError::MalformedInput(format!(
                "spent marker is {} bytes, spender starts at {SPENDER_OFFSET}",
                raw.len()
            )));
        }
        let end = raw.len().min(SPENDER_MAX_END);
        let spender = String::from_utf8(raw[SPENDER_OFFSET..end].to_vec())
            .map_err(|_| IndexerError::MalformedInput("spender is not utf-8".into()))?;
        Ok(Self { spender })
    }

    /// Marker value as ingestion writes it: spending input reference padded
    /// into the leading 64 bytes, then the spender txid.
    pub fn encode(spending_input: &str, spender: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(SPENDER_OFFSET + spender.len());
        let head = spending_input.as_bytes();
        let take = head.len().min(SPENDER_OFFSET);
        out.extend_from_slice(&head[..take]);
        out.resize(SPENDER_OFFSET, b'0');
        out.extend_from_slice(spender.as_bytes());
        out
    }
}
