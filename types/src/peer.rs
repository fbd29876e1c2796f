//! Peer identity and shard classification
//!
//! A `PeerId` is an opaque byte string. The printable form is lowercase hex,
//! which is also the form embedded in peer addresses (`.../p2p/<hex>`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shard identifier
pub type ShardId = u32;

/// Opaque peer identity, compared by exact byte equality
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(Vec<u8>);

impl PeerId {
    /// Create a peer id from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a hex encoded peer id
    pub fn from_hex(encoded: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(encoded).map(Self)
    }

    /// Extract the peer id carried by an address ending in `/p2p/<hex>`
    pub fn from_address(address: &str) -> Option<Self> {
        let (_, encoded) = address.rsplit_once("/p2p/")?;
        let encoded = encoded.trim_end_matches('/');
        Self::from_hex(encoded).ok().filter(|pid| !pid.is_empty())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Printable form used in logs and seeder addresses
    pub fn pretty(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.pretty())
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<Vec<u8>> for PeerId {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for PeerId {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for PeerId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Role a peer plays in the network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerType {
    #[default]
    Unknown,
    Observer,
    Validator,
    Seeder,
}

impl fmt::Display for PeerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerType::Unknown => write!(f, "unknown"),
            PeerType::Observer => write!(f, "observer"),
            PeerType::Validator => write!(f, "validator"),
            PeerType::Seeder => write!(f, "seeder"),
        }
    }
}

/// Refinement of the peer role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerSubType {
    #[default]
    Regular,
    FullHistory,
}

impl fmt::Display for PeerSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSubType::Regular => write!(f, "regular"),
            PeerSubType::FullHistory => write!(f, "full history"),
        }
    }
}

/// Classification of a peer as reported by a shard resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerShardInfo {
    pub peer_type: PeerType,
    pub peer_sub_type: PeerSubType,
    pub shard_id: ShardId,
}

impl PeerShardInfo {
    /// Info reported for peers nobody knows about
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn validator(shard_id: ShardId) -> Self {
        Self {
            peer_type: PeerType::Validator,
            peer_sub_type: PeerSubType::Regular,
            shard_id,
        }
    }

    pub fn observer(shard_id: ShardId) -> Self {
        Self {
            peer_type: PeerType::Observer,
            peer_sub_type: PeerSubType::Regular,
            shard_id,
        }
    }

    pub fn seeder() -> Self {
        Self {
            peer_type: PeerType::Seeder,
            ..Self::default()
        }
    }
}
