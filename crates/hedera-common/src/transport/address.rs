use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::protocol::HederaError;

const IN_PROCESS_PREFIX: &str = "in-process:";

/// Physical address of one node endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeAddress {
    /// Reachable over gRPC at `host:port`.
    Grpc { host: String, port: u16 },
    /// Named in-process channel, written `in-process:<name>`.
    InProcess(String),
}

impl NodeAddress {
    pub fn grpc(host: impl Into<String>, port: u16) -> Self {
        NodeAddress::Grpc {
            host: host.into(),
            port,
        }
    }

    pub fn in_process(name: impl Into<String>) -> Self {
        NodeAddress::InProcess(name.into())
    }

    /// URI for a tonic endpoint. `None` for in-process channels.
    pub fn to_uri(&self) -> Option<String> {
        match self {
            NodeAddress::Grpc { host, port } => Some(format!("http://{}:{}", host, port)),
            NodeAddress::InProcess(_) => None,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAddress::Grpc { host, port } => write!(f, "{}:{}", host, port),
            NodeAddress::InProcess(name) => write!(f, "{}{}", IN_PROCESS_PREFIX, name),
        }
    }
}

impl FromStr for NodeAddress {
    type Err = HederaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(name) = s.strip_prefix(IN_PROCESS_PREFIX) {
            if name.is_empty() {
                return Err(HederaError::InvalidAddress(format!(
                    "'{}' has an empty channel name",
                    s
                )));
            }
            return Ok(NodeAddress::InProcess(name.to_string()));
        }

        let rest = s
            .strip_prefix("http://")
            .or_else(|| s.strip_prefix("https://"))
            .unwrap_or(s)
            .trim_end_matches('/');

        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| HederaError::InvalidAddress(format!("'{}' is missing a port", s)))?;

        if host.is_empty() {
            return Err(HederaError::InvalidAddress(format!("'{}' is missing a host", s)));
        }

        let port = port
            .parse::<u16>()
            .map_err(|e| HederaError::InvalidAddress(format!("'{}': bad port: {}", s, e)))?;

        Ok(NodeAddress::grpc(host, port))
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
