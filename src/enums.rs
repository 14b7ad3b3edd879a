use std::{fmt::Display, str::FromStr};

use crate::errors::WireError;
use bitflags::bitflags;

bitflags! {
    pub struct ServiceIdentifier: u64 {
        const UNNAMED = 0x00;
        const NODE_NETWORK = 0x01;
        const NODE_GETUTXO = 0x02;
        const NODE_BLOOM = 0x04;
        const NODE_WITNESS = 0x08;
        const NODE_XTHIN = 0x10;
        const NODE_NETWORK_LIMITED = 0x0400;
    }
}

/// Network a message belongs to, identified on the wire by its magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chain {
    #[default]
    Regtest,
    Testnet3,
}

impl Chain {
    pub const fn magic(&self) -> u32 {
        match self {
            Chain::Regtest => 0xDAB5BFFA,
            Chain::Testnet3 => 0x0709110B,
        }
    }

    pub fn from_magic(magic: u32) -> Result<Self, WireError> {
        [Chain::Regtest, Chain::Testnet3]
            .into_iter()
            .find(|c| c.magic() == magic)
            .ok_or_else(|| WireError::UnknownChain(format!("{:#010x}", magic)))
    }
}

impl Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Chain::Regtest => "regtest",
            Chain::Testnet3 => "testnet3",
        };

        write!(f, "{}", s)
    }
}

impl FromStr for Chain {
    type Err = WireError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "regtest" => Ok(Chain::Regtest),
            "testnet3" | "testnet" => Ok(Chain::Testnet3),
            _ => Err(WireError::UnknownChain(value.to_string())),
        }
    }
}

impl TryFrom<u32> for Chain {
    type Error = WireError;

    fn try_from(magic: u32) -> Result<Self, Self::Error> {
        Chain::from_magic(magic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_values() {
        assert_eq!(Chain::Regtest.magic(), 0xDAB5BFFA);
        assert_eq!(Chain::Testnet3.magic(), 0x0709110B);
    }

    #[test]
    fn chain_from_magic() {
        assert_eq!(Chain::try_from(0xDAB5BFFA).unwrap(), Chain::Regtest);
        assert_eq!(Chain::try_from(0x0709110B).unwrap(), Chain::Testnet3);
        assert!(matches!(
            Chain::try_from(0xD9B4BEF9),
            Err(WireError::UnknownChain(m)) if m == "0xd9b4bef9"
        ));
    }

    #[test]
    fn chain_from_name() {
        assert_eq!("regtest".parse::<Chain>().unwrap(), Chain::Regtest);
        assert_eq!("Testnet3".parse::<Chain>().unwrap(), Chain::Testnet3);
        assert_eq!("testnet".parse::<Chain>().unwrap(), Chain::Testnet3);
        assert!(matches!(
            "mainnet".parse::<Chain>(),
            Err(WireError::UnknownChain(_))
        ));
    }

    #[test]
    fn display_parses_back() {
        for chain in [Chain::Regtest, Chain::Testnet3] {
            assert_eq!(chain.to_string().parse::<Chain>().unwrap(), chain);
        }
    }

    #[test]
    fn unknown_service_bits_are_dropped() {
        let services = ServiceIdentifier::from_bits_truncate(0x1 | 0x8 | 0x8000);
        assert_eq!(
            services,
            ServiceIdentifier::NODE_NETWORK | ServiceIdentifier::NODE_WITNESS
        );
    }
}
