//! Hash and EC primitives used by the address codec.
//!
//! The verify-only EC context is process-wide: created once by the first key
//! decompression and kept for the life of the process. Everything here is safe
//! to call from any thread.

use std::sync::OnceLock;

use bitcoin::hashes::{Hash, ripemd160, sha256, sha256d};
use bitcoin::secp256k1::{PublicKey, Secp256k1, VerifyOnly};

static VERIFY_CTX: OnceLock<Secp256k1<VerifyOnly>> = OnceLock::new();

pub fn verification_context() -> &'static Secp256k1<VerifyOnly> {
    VERIFY_CTX.get_or_init(Secp256k1::verification_only)
}

pub const COMPRESSED_PUBKEY_LEN: usize = 33;
pub const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    ripemd160::Hash::hash(data).to_byte_array()
}

/// `ripemd160(sha256(data))`
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

/// Expand a 33-byte compressed key to its 65-byte uncompressed form.
///
/// Returns an empty vector when the input is not a valid compressed point.
pub fn decompress_pub_key(compressed: &[u8]) -> Vec<u8> {
    if compressed.len() != COMPRESSED_PUBKEY_LEN {
        return Vec::new();
    }
    // context must exist before the first key is handed out
    verification_context();
    match PublicKey::from_slice(compressed) {
        Ok(pk) => pk.serialize_uncompressed().to_vec(),
        Err(_) => Vec::new(),
    }
}

/// Inverse of [`decompress_pub_key`]; empty on malformed input.
pub fn compress_pub_key(uncompressed: &[u8]) -> Vec<u8> {
    if uncompressed.len() != UNCOMPRESSED_PUBKEY_LEN {
        return Vec::new();
    }
    match PublicKey::from_slice(uncompressed) {
        Ok(pk) => pk.serialize().to_vec(),
        Err(_) => Vec::new(),
    }
}
