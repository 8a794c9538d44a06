//! Node identifiers and tree entries

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::TopologyError;

/// A 6-byte mesh station address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddr(pub [u8; 6]);

impl NodeAddr {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Last three bytes, e.g. `dd:ee:ff`. Used as the node label in
    /// rendered trees and logs.
    pub fn short(&self) -> String {
        format!("{:02x}:{:02x}:{:02x}", self.0[3], self.0[4], self.0[5])
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddr({})", self)
    }
}

impl From<[u8; 6]> for NodeAddr {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl FromStr for NodeAddr {
    type Err = TopologyError;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = if s.contains(':') {
            let parts: Vec<&str> = s.split(':').collect();
            if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
                return Err(TopologyError::InvalidAddress(s.to_string()));
            }
            parts.concat()
        } else {
            s.to_string()
        };

        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&digits, &mut bytes)
            .map_err(|e| TopologyError::InvalidAddress(format!("{}: {}", s, e)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for NodeAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One tracked mesh node: who it is, who it hangs off, and at what layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshNode {
    pub node_id: NodeAddr,
    pub parent_id: NodeAddr,
    /// Hops from the virtual gateway. Stored nodes are always at layer 2 or deeper.
    pub layer: u8,
}
