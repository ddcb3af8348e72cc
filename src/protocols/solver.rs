use bitcoin::Script;
use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::{OP_CHECKMULTISIG, OP_PUSHNUM_1, OP_PUSHNUM_16};
use bitcoin::script::Instruction;

use crate::address::{
    bech32_address, public_key_to_address, ripemd160_to_p2pkh_address, ripemd160_to_p2sh_address,
};
use crate::consts::Network;
use crate::crypto::{COMPRESSED_PUBKEY_LEN, UNCOMPRESSED_PUBKEY_LEN};
use crate::protocols::ScriptSolver;

/// Address extraction for the standard output templates.
///
/// P2PKH, P2SH and segwit v0 yield one address, P2PK yields the key's P2PKH
/// address, bare multisig yields one address per key. Anything else (OP_RETURN
/// included) yields none.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardScriptSolver {
    network: Network,
}

impl StandardScriptSolver {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    fn multisig_addresses(&self, script: &Script) -> Vec<String> {
        let mut keys = Vec::new();
        let mut ops = Vec::new();
        for ins in script.instructions() {
            match ins {
                Ok(Instruction::PushBytes(pb)) => {
                    let b = pb.as_bytes();
                    if b.len() == COMPRESSED_PUBKEY_LEN || b.len() == UNCOMPRESSED_PUBKEY_LEN {
                        keys.push(b.to_vec());
                    } else {
                        return Vec::new();
                    }
                }
                Ok(Instruction::Op(op)) => ops.push(op),
                Err(_) => return Vec::new(),
            }
        }
        let is_pushnum =
            |op: &Opcode| (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&op.to_u8());
        let shaped = ops.len() == 3
            && is_pushnum(&ops[0])
            && is_pushnum(&ops[1])
            && ops[2] == OP_CHECKMULTISIG
            && !keys.is_empty();
        if !shaped {
            return Vec::new();
        }
        keys.iter().map(|k| public_key_to_address(k, self.network)).collect()
    }
}

impl ScriptSolver for StandardScriptSolver {
    fn get_addresses_from_script(&self, script: &[u8]) -> Vec<String> {
        let s = Script::from_bytes(script);
        let b = s.as_bytes();
        if s.is_p2pkh() {
            vec![ripemd160_to_p2pkh_address(&b[3..23], self.network)]
        } else if s.is_p2sh() {
            vec![ripemd160_to_p2sh_address(&b[2..22], self.network)]
        } else if s.is_p2wpkh() || s.is_p2wsh() {
            vec![bech32_address(&b[2..], self.network)]
        } else if s.is_p2pk() {
            vec![public_key_to_address(&b[1..b.len() - 1], self.network)]
        } else if s.is_op_return() {
            Vec::new()
        } else {
            self.multisig_addresses(s)
        }
    }
}
