/// Hex-decode `hex_str`. Malformed input (odd length, non-hex chars) yields an
/// empty vector rather than an error.
pub fn hex_to_bytes(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap_or_default()
}

pub fn hash_to_hex(hash: &[u8]) -> String {
    hex::encode(hash)
}

/// Hex-encode with the byte order reversed, the display convention for block
/// and transaction hashes.
pub fn hash_to_reverse_hex(hash: &[u8]) -> String {
    if hash.is_empty() {
        return String::new();
    }
    let reversed: Vec<u8> = hash.iter().rev().copied().collect();
    hex::encode(reversed)
}

/// True when `s` is non-empty lowercase hex of even length.
pub fn is_hex_id(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
