//! Address strings from hashes and public keys.
//!
//! Legacy addresses are Base58Check over `version || hash160`; segwit addresses
//! are Bech32 over `witness_version || convert_bits(program, 8, 5)`.

use bitcoin::base58;
use bitcoin::bech32::primitives::decode::CheckedHrpstring;
use bitcoin::bech32::{Bech32, Fe32, Fe32IterExt, Hrp};

use crate::consts::{ESIGNATURE_SENTINEL_ADDRESS, Network};
use crate::crypto::{double_sha256, hash160};

/// Longest Base58 string the legacy encoder could hold (80-byte buffer, NUL excluded).
pub const MAX_BASE58_LEN: usize = 79;

pub const CHECKSUM_LEN: usize = 4;

pub const SEGWIT_V0: u8 = 0;

pub fn public_key_to_address(pub_key: &[u8], network: Network) -> String {
    ripemd160_to_p2pkh_address(&hash160(pub_key), network)
}

pub fn ripemd160_to_p2pkh_address(hash: &[u8], network: Network) -> String {
    ripemd160_to_address(network.p2pkh_version(), hash)
}

pub fn ripemd160_to_p2sh_address(hash: &[u8], network: Network) -> String {
    ripemd160_to_address(network.p2sh_version(), hash)
}

/// Base58Check: `version || hash || sha256d(version || hash)[..4]`.
pub fn ripemd160_to_address(version: u8, hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + hash.len() + CHECKSUM_LEN);
    payload.push(version);
    payload.extend_from_slice(hash);
    let checksum = double_sha256(&payload);
    payload.extend_from_slice(&checksum[..CHECKSUM_LEN]);
    base58_encode(&payload)
}

/// Base58 with leading-zero preservation. Empty when the result would overflow
/// [`MAX_BASE58_LEN`].
pub fn base58_encode(data: &[u8]) -> String {
    let encoded = base58::encode(data);
    if encoded.len() > MAX_BASE58_LEN {
        return String::new();
    }
    encoded
}

/// Split a Base58Check string into `(version, payload)` after verifying the
/// checksum.
pub fn decode_base58_check(address: &str) -> Option<(u8, Vec<u8>)> {
    let raw = base58::decode(address).ok()?;
    if raw.len() < 1 + CHECKSUM_LEN {
        return None;
    }
    let (body, checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if double_sha256(body)[..CHECKSUM_LEN] != *checksum {
        return None;
    }
    Some((body[0], body[1..].to_vec()))
}

/// Regroup a bit stream from `from_bits`-wide to `to_bits`-wide groups.
///
/// With `pad`, a trailing partial group is zero-filled. Without it, leftover
/// bits must be fewer than `from_bits` and all zero, else `None`.
pub fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to_bits) - 1;
    let max_acc: u32 = (1 << (from_bits + to_bits - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from_bits as usize / to_bits as usize + 1);

    for &value in data {
        let value = value as u32;
        if value >> from_bits != 0 {
            return None;
        }
        acc = ((acc << from_bits) | value) & max_acc;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(out)
}

/// Segwit v0 address for a witness program (20-byte key hash or 32-byte script
/// hash). Empty when the program cannot be regrouped.
pub fn bech32_address(program: &[u8], network: Network) -> String {
    let Some(groups) = convert_bits(program, 8, 5, true) else {
        return String::new();
    };
    let Ok(hrp) = Hrp::parse(network.bech32_hrp()) else {
        return String::new();
    };

    let mut data = Vec::with_capacity(groups.len() + 1);
    data.push(Fe32::Q);
    for g in groups {
        match Fe32::try_from(g) {
            Ok(fe) => data.push(fe),
            Err(_) => return String::new(),
        }
    }
    let encoder = data.into_iter().with_checksum::<Bech32>(&hrp);
    encoder.chars().collect()
}

/// Decode a segwit address for `network` into `(witness_version, program)`.
pub fn decode_bech32_address(address: &str, network: Network) -> Option<(u8, Vec<u8>)> {
    let checked = CheckedHrpstring::new::<Bech32>(address).ok()?;
    let expected = Hrp::parse(network.bech32_hrp()).ok()?;
    if checked.hrp() != expected {
        return None;
    }

    let mut fes = Vec::new();
    for &c in checked.data_part_ascii_no_checksum() {
        fes.push(Fe32::from_char(c as char).ok()?.to_u8());
    }
    let (&version, groups) = fes.split_first()?;
    let program = convert_bits(groups, 5, 8, false)?;
    Some((version, program))
}

/// True when `address` is a P2PKH, P2SH or segwit address of `network`.
pub fn is_network_address(address: &str, network: Network) -> bool {
    match decode_base58_check(address) {
        Some((version, _)) => version == network.p2pkh_version() || version == network.p2sh_version(),
        None => decode_bech32_address(address, network).is_some(),
    }
}

/// The well-known sentinel key hash rendered for `network`.
pub fn default_esignature_sentinel(network: Network) -> String {
    match decode_base58_check(ESIGNATURE_SENTINEL_ADDRESS) {
        Some((_, hash)) => ripemd160_to_p2pkh_address(&hash, network),
        None => ESIGNATURE_SENTINEL_ADDRESS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::bech32::segwit;

    fn sample_hash(seed: u8) -> [u8; 20] {
        let mut h = [0u8; 20];
        for (i, b) in h.iter_mut().enumerate() {
            *b = seed.wrapping_mul(31).wrapping_add(i as u8 * 7);
        }
        h
    }

    #[test]
    fn base58check_round_trips_for_all_versions() {
        for network in [Network::Mainnet, Network::Testnet] {
            for seed in 0..16u8 {
                let hash = sample_hash(seed);
                for (addr, version) in [
                    (ripemd160_to_p2pkh_address(&hash, network), network.p2pkh_version()),
                    (ripemd160_to_p2sh_address(&hash, network), network.p2sh_version()),
                ] {
                    let (v, payload) = decode_base58_check(&addr).expect("valid checksum");
                    assert_eq!(v, version);
                    assert_eq!(payload, hash);
                }
            }
        }
    }

    #[test]
    fn mainnet_p2pkh_starts_with_v() {
        let addr = ripemd160_to_p2pkh_address(&[0u8; 20], Network::Mainnet);
        assert!(addr.starts_with('V'), "{addr}");
        assert_eq!(addr.len(), 34);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let addr = ripemd160_to_p2pkh_address(&sample_hash(3), Network::Mainnet);
        let mut chars: Vec<char> = addr.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let broken: String = chars.into_iter().collect();
        assert!(decode_base58_check(&broken).is_none());
    }

    #[test]
    fn base58_keeps_leading_zero_bytes() {
        assert_eq!(base58_encode(&[0, 0, 1]), "112");
        assert_eq!(base58_encode(&[]), "");
    }

    #[test]
    fn base58_overflow_yields_empty() {
        assert!(base58_encode(&[0xff; 40]).len() <= MAX_BASE58_LEN);
        assert!(base58_encode(&[0xff; 80]).is_empty());
    }

    #[test]
    fn public_key_address_hashes_the_key() {
        let key = [0x02u8; 33];
        assert_eq!(
            public_key_to_address(&key, Network::Testnet),
            ripemd160_to_p2pkh_address(&hash160(&key), Network::Testnet)
        );
    }

    #[test]
    fn convert_bits_pads_on_encode() {
        assert_eq!(convert_bits(&[0xff], 8, 5, true), Some(vec![31, 28]));
    }

    #[test]
    fn convert_bits_rejects_nonzero_padding_on_decode() {
        assert_eq!(convert_bits(&[31, 28], 5, 8, false), Some(vec![0xff]));
        assert_eq!(convert_bits(&[31, 29], 5, 8, false), None);
    }

    #[test]
    fn convert_bits_rejects_leftover_group() {
        // 3 * 5 = 15 bits: one byte plus 7 leftover bits >= 5
        assert_eq!(convert_bits(&[0, 0, 0], 5, 8, false), None);
    }

    #[test]
    fn bech32_matches_reference_segwit_encoder() {
        for network in [Network::Mainnet, Network::Testnet] {
            let hash = sample_hash(9);
            let ours = bech32_address(&hash, network);
            let hrp = Hrp::parse(network.bech32_hrp()).unwrap();
            let reference = segwit::encode_v0(hrp, &hash).unwrap();
            assert_eq!(ours, reference);
            assert!(ours.starts_with(&format!("{}1q", network.bech32_hrp())));
        }
    }

    #[test]
    fn bech32_round_trip() {
        for len in [20usize, 32] {
            let program: Vec<u8> = (0..len as u8).collect();
            let addr = bech32_address(&program, Network::Testnet);
            let (version, decoded) = decode_bech32_address(&addr, Network::Testnet).unwrap();
            assert_eq!(version, SEGWIT_V0);
            assert_eq!(decoded, program);
            assert!(decode_bech32_address(&addr, Network::Mainnet).is_none());
        }
    }

    #[test]
    fn sentinel_follows_network() {
        assert_eq!(default_esignature_sentinel(Network::Testnet), ESIGNATURE_SENTINEL_ADDRESS);
        let mainnet = default_esignature_sentinel(Network::Mainnet);
        assert!(mainnet.starts_with('V'));
        assert!(is_network_address(&mainnet, Network::Mainnet));
        assert!(!is_network_address(&mainnet, Network::Testnet));

        let (_, main_hash) = decode_base58_check(&mainnet).unwrap();
        let (_, test_hash) = decode_base58_check(ESIGNATURE_SENTINEL_ADDRESS).unwrap();
        assert_eq!(main_hash, test_hash);
    }

    #[test]
    fn network_address_kinds() {
        let hash = sample_hash(3);
        for network in [Network::Mainnet, Network::Testnet] {
            assert!(is_network_address(&ripemd160_to_p2sh_address(&hash, network), network));
            assert!(is_network_address(&bech32_address(&hash, network), network));
        }
        assert!(!is_network_address(&bech32_address(&hash, Network::Testnet), Network::Mainnet));
        assert!(!is_network_address("nope", Network::Mainnet));
    }
}
