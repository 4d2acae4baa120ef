use std::fmt;
use std::str::FromStr;

use hedera_common::transport::NodeAddress;
use hedera_common::{AccountId, HederaError};
use serde::{Deserialize, Serialize};

use crate::address_book::AddressBook;

/// Publicly known Hedera networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkName {
    Mainnet,
    Testnet,
    Previewnet,
}

const MAINNET: &[(u64, &str)] = &[
    (3, "35.237.200.180"),
    (4, "35.186.191.247"),
    (5, "35.192.2.25"),
    (6, "35.199.161.108"),
    (7, "35.203.82.240"),
    (8, "35.236.5.219"),
    (9, "35.197.192.225"),
    (10, "35.242.233.154"),
    (11, "35.240.118.96"),
    (12, "35.204.86.32"),
];

const TESTNET: &[(u64, &str)] = &[
    (3, "0.testnet.hedera.com"),
    (4, "1.testnet.hedera.com"),
    (5, "2.testnet.hedera.com"),
    (6, "3.testnet.hedera.com"),
];

const PREVIEWNET: &[(u64, &str)] = &[
    (3, "0.previewnet.hedera.com"),
    (4, "1.previewnet.hedera.com"),
    (5, "2.previewnet.hedera.com"),
    (6, "3.previewnet.hedera.com"),
];

/// Plaintext gRPC port of consensus nodes.
pub const NODE_PORT: u16 = 50211;

impl NetworkName {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkName::Mainnet => "mainnet",
            NetworkName::Testnet => "testnet",
            NetworkName::Previewnet => "previewnet",
        }
    }

    /// The network's consensus nodes.
    pub fn address_book(&self) -> AddressBook {
        let nodes = match self {
            NetworkName::Mainnet => MAINNET,
            NetworkName::Testnet => TESTNET,
            NetworkName::Previewnet => PREVIEWNET,
        };

        nodes
            .iter()
            .map(|(num, host)| (AccountId::from_num(*num), NodeAddress::grpc(*host, NODE_PORT)))
            .collect()
    }
}

impl fmt::Display for NetworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkName {
    type Err = HederaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkName::Mainnet),
            "testnet" => Ok(NetworkName::Testnet),
            "previewnet" => Ok(NetworkName::Previewnet),
            other => Err(HederaError::InvalidConfig(format!(
                "unknown network '{}', expected mainnet, testnet or previewnet",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnet_nodes() {
        let book = NetworkName::Testnet.address_book();
        assert_eq!(book.len(), 4);
        assert_eq!(
            book.addresses(&AccountId::from_num(3)),
            &[NodeAddress::grpc("0.testnet.hedera.com", 50211)]
        );
    }

    #[test]
    fn test_mainnet_starts_at_node_3() {
        let book = NetworkName::Mainnet.address_book();
        let first = book.account_ids().next().unwrap();
        assert_eq!(first, AccountId::from_num(3));
        assert_eq!(book.len(), MAINNET.len());
    }

    #[test]
    fn test_network_name_parse() {
        assert_eq!("Testnet".parse::<NetworkName>().unwrap(), NetworkName::Testnet);
        assert_eq!(NetworkName::Previewnet.to_string(), "previewnet");
        assert!("localnet".parse::<NetworkName>().is_err());
    }
}
