use serde::Serialize;

use crate::consts::{IDENTITY_PREFIX, OP_RETURN, PROTOCOL_MARKER_VALUE};
use crate::protocols::{ParsedTransaction, TxOutput};

pub const PROTOCOL_OUTPUT_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolKind {
    Esignature,
    Identity,
}

impl ProtocolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolKind::Esignature => "esignature",
            ProtocolKind::Identity => "identity",
        }
    }
}

/// Constraint on one output: an exact value and/or a script prefix.
#[derive(Clone, Copy, Debug)]
pub struct OutputPattern {
    pub value: Option<u64>,
    pub script_prefix: &'static [u8],
}

impl OutputPattern {
    pub const ANY: Self = Self { value: None, script_prefix: &[] };

    pub const fn value(value: u64) -> Self {
        Self { value: Some(value), script_prefix: &[] }
    }

    pub const fn data(value: u64, script_prefix: &'static [u8]) -> Self {
        Self { value: Some(value), script_prefix }
    }

    pub fn matches(&self, out: &TxOutput) -> bool {
        self.value.is_none_or(|v| v == out.value) && out.script.starts_with(self.script_prefix)
    }
}

/// Output-shape signature of one embedded protocol.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolSignature {
    pub kind: ProtocolKind,
    pub outputs: [OutputPattern; PROTOCOL_OUTPUT_COUNT],
    /// Output whose single solved address is the recipient.
    pub recipient_output: usize,
    /// Output whose script is carried as the protocol payload.
    pub payload_output: usize,
    /// Output that must solve to exactly the configured sentinel address.
    pub sentinel_output: Option<usize>,
}

impl ProtocolSignature {
    pub fn matches_shape(&self, tx: &ParsedTransaction) -> bool {
        tx.outputs.len() == PROTOCOL_OUTPUT_COUNT
            && self.outputs.iter().zip(&tx.outputs).all(|(p, o)| p.matches(o))
    }
}

const OP_RETURN_PREFIX: &[u8] = &[OP_RETURN];

pub const ESIGNATURE: ProtocolSignature = ProtocolSignature {
    kind: ProtocolKind::Esignature,
    outputs: [
        OutputPattern::ANY,
        OutputPattern::value(PROTOCOL_MARKER_VALUE),
        OutputPattern::data(0, OP_RETURN_PREFIX),
        OutputPattern::ANY,
    ],
    recipient_output: 1,
    payload_output: 2,
    sentinel_output: Some(3),
};

pub const IDENTITY: ProtocolSignature = ProtocolSignature {
    kind: ProtocolKind::Identity,
    outputs: [
        OutputPattern::ANY,
        OutputPattern::value(PROTOCOL_MARKER_VALUE),
        OutputPattern::data(0, IDENTITY_PREFIX),
        OutputPattern::data(0, OP_RETURN_PREFIX),
    ],
    recipient_output: 1,
    payload_output: 3,
    sentinel_output: None,
};

pub const PROTOCOL_SIGNATURES: &[ProtocolSignature] = &[ESIGNATURE, IDENTITY];

pub fn signature_for(kind: ProtocolKind) -> &'static ProtocolSignature {
    match kind {
        ProtocolKind::Esignature => &PROTOCOL_SIGNATURES[0],
        ProtocolKind::Identity => &PROTOCOL_SIGNATURES[1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::TxInput;

    fn tx(outputs: Vec<(u64, Vec<u8>)>) -> ParsedTransaction {
        ParsedTransaction {
            tx_hash: "00".repeat(32),
            inputs: vec![TxInput { tx_hash: "11".repeat(32), vout: 0 }],
            outputs: outputs.into_iter().map(|(value, script)| TxOutput { value, script }).collect(),
        }
    }

    #[test]
    fn table_lookup_by_kind() {
        assert_eq!(signature_for(ProtocolKind::Esignature).kind, ProtocolKind::Esignature);
        assert_eq!(signature_for(ProtocolKind::Identity).kind, ProtocolKind::Identity);
    }

    #[test]
    fn esignature_shape() {
        let t = tx(vec![(5000, vec![0x76]), (100, vec![0x76]), (0, vec![0x6a, 0x20]), (1, vec![0xa9])]);
        assert!(ESIGNATURE.matches_shape(&t));
        assert!(!IDENTITY.matches_shape(&t));
    }

    #[test]
    fn identity_shape() {
        let mut payload = IDENTITY_PREFIX.to_vec();
        payload.extend_from_slice(b"xyz");
        let t = tx(vec![(5000, vec![]), (100, vec![0x76]), (0, payload), (0, vec![0x6a, 0x10])]);
        assert!(IDENTITY.matches_shape(&t));
        // an identity tx also has the esignature output shape; the sentinel
        // check on output 3 tells them apart
        assert!(ESIGNATURE.matches_shape(&t));
    }

    #[test]
    fn short_and_empty_scripts_do_not_match() {
        let t = tx(vec![(0, vec![]), (100, vec![]), (0, vec![]), (0, vec![])]);
        assert!(!ESIGNATURE.matches_shape(&t));
        assert!(!IDENTITY.matches_shape(&t));

        let truncated = tx(vec![(0, vec![]), (100, vec![]), (0, vec![0x6a, 0x04, b'I']), (0, vec![0x6a])]);
        assert!(!IDENTITY.matches_shape(&truncated));
    }

    #[test]
    fn output_count_must_be_four() {
        let t = tx(vec![(0, vec![]), (100, vec![]), (0, vec![0x6a])]);
        assert!(!ESIGNATURE.matches_shape(&t));
    }
}
