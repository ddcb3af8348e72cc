use std::fmt;
use std::str::FromStr;

/// Chain the indexer is serving. Selects version bytes and the bech32 prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }

    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x47,
            Network::Testnet => 0x4A,
        }
    }

    pub fn p2sh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x05,
            Network::Testnet => 0xC4,
        }
    }

    pub fn bech32_hrp(self) -> &'static str {
        match self {
            Network::Mainnet => "vtc",
            Network::Testnet => "tvtc",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "vertcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            _ => Err("invalid value for network: expected mainnet | testnet".into()),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

/// Output paid to by every document-signature transaction.
pub const ESIGNATURE_SENTINEL_ADDRESS: &str = "WxVSkmSUCUXFsnTRVdy5s2jtXXiwdjg75P";

/// Value carried by the recipient output of an embedded-protocol transaction.
pub const PROTOCOL_MARKER_VALUE: u64 = 100;

pub const OP_RETURN: u8 = 0x6A;

/// `OP_RETURN PUSH4 "IDEN"`
pub const IDENTITY_PREFIX: &[u8] = &[0x6A, 0x04, b'I', b'D', b'E', b'N'];

pub const DEFAULT_HTTP_PORT: u16 = 8888;
