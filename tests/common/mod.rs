#![allow(dead_code)]

use vtc_blockindexer::address::{decode_base58_check, ripemd160_to_p2pkh_address};
use vtc_blockindexer::consts::{ESIGNATURE_SENTINEL_ADDRESS, Network};
use vtc_blockindexer::test_utils::p2pkh_script;

/// The well-known sentinel is a testnet P2PKH address.
pub const NET: Network = Network::Testnet;

pub fn sentinel_script() -> Vec<u8> {
    let (_, hash) = decode_base58_check(ESIGNATURE_SENTINEL_ADDRESS).expect("sentinel decodes");
    let hash: [u8; 20] = hash.try_into().expect("20-byte hash");
    p2pkh_script(&hash)
}

/// P2PKH script and its address for a key hash of repeated `b`.
pub fn wallet(b: u8) -> (Vec<u8>, String) {
    (p2pkh_script(&[b; 20]), ripemd160_to_p2pkh_address(&[b; 20], NET))
}
