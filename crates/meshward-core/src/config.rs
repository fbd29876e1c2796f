//! Configuration module for meshward nodes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node ID, a label for logs; the peer identity comes from the host
    pub node_id: String,

    /// Network configuration
    pub network: NetworkConfig,

    /// Peer membership configuration
    pub p2p: P2pConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Listen port
    pub port: u16,

    /// Which connections watcher reports new connections
    pub connection_watcher_type: ConnectionWatcherType,

    /// How long the print watcher remembers a reported peer
    pub connection_watcher_ttl_in_sec: u32,
}

/// Peer membership configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    pub sharding: ShardingConfig,
    pub kad_dht_peer_discovery: KadDhtPeerDiscoveryConfig,
    pub peers_rating: PeersRatingConfig,
}

/// Selects the eviction policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardingType {
    /// Per-class quotas
    #[default]
    ListsSharder,
    /// One quota over all peers
    OneListSharder,
    /// Sharding disabled
    NilListSharder,
}

impl fmt::Display for ShardingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardingType::ListsSharder => write!(f, "ListsSharder"),
            ShardingType::OneListSharder => write!(f, "OneListSharder"),
            ShardingType::NilListSharder => write!(f, "NilListSharder"),
        }
    }
}

impl FromStr for ShardingType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ListsSharder" => Ok(Self::ListsSharder),
            "OneListSharder" => Ok(Self::OneListSharder),
            "NilListSharder" => Ok(Self::NilListSharder),
            other => Err(ConfigError::UnknownType {
                kind: "sharding",
                value: other.to_string(),
            }),
        }
    }
}

/// Selects the Kad-DHT discoverer implementation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KadDhtType {
    /// Continuous discoverer driven by the initial peers list
    Legacy,
    /// Single processing loop with periodic seeder reconnection
    #[default]
    Optimized,
}

impl fmt::Display for KadDhtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KadDhtType::Legacy => write!(f, "legacy"),
            KadDhtType::Optimized => write!(f, "optimized"),
        }
    }
}

impl FromStr for KadDhtType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "optimized" => Ok(Self::Optimized),
            other => Err(ConfigError::UnknownType {
                kind: "kad-dht discovery",
                value: other.to_string(),
            }),
        }
    }
}

/// Selects how new connections are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionWatcherType {
    #[default]
    #[serde(alias = "")]
    Disabled,
    Print,
}

impl FromStr for ConnectionWatcherType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "disabled" => Ok(Self::Disabled),
            "print" => Ok(Self::Print),
            other => Err(ConfigError::UnknownType {
                kind: "connections watcher",
                value: other.to_string(),
            }),
        }
    }
}

/// Connection budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingConfig {
    #[serde(rename = "type")]
    pub sharding_type: ShardingType,
    pub target_peer_count: u32,
    pub max_intra_shard_validators: u32,
    pub max_cross_shard_validators: u32,
    pub max_intra_shard_observers: u32,
    pub max_cross_shard_observers: u32,
    pub max_seeders: u32,
}

impl ShardingConfig {
    /// Sum of the per-class quotas; the rest of the target goes to unknown peers
    pub fn classified_quota(&self) -> u64 {
        [
            self.max_intra_shard_validators,
            self.max_cross_shard_validators,
            self.max_intra_shard_observers,
            self.max_cross_shard_observers,
            self.max_seeders,
        ]
        .iter()
        .map(|quota| u64::from(*quota))
        .sum()
    }
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            sharding_type: ShardingType::ListsSharder,
            target_peer_count: 36,
            max_intra_shard_validators: 7,
            max_cross_shard_validators: 15,
            max_intra_shard_observers: 2,
            max_cross_shard_observers: 3,
            max_seeders: 2,
        }
    }
}

/// Kad-DHT discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KadDhtPeerDiscoveryConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub dht_type: KadDhtType,
    pub refresh_interval_in_sec: u32,
    pub routing_table_refresh_interval_in_sec: u32,
    /// Only used by the optimized discoverer
    pub seeders_reconnection_interval_in_sec: u32,
    pub protocol_id: String,
    pub initial_peer_list: Vec<String>,
    pub bucket_size: u32,
}

impl KadDhtPeerDiscoveryConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval_in_sec))
    }

    pub fn routing_table_refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.routing_table_refresh_interval_in_sec))
    }

    pub fn seeders_reconnection_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.seeders_reconnection_interval_in_sec))
    }
}

impl Default for KadDhtPeerDiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dht_type: KadDhtType::Optimized,
            refresh_interval_in_sec: 10,
            routing_table_refresh_interval_in_sec: 300,
            seeders_reconnection_interval_in_sec: 300,
            protocol_id: "/meshward/kad/1.0.0".to_string(),
            initial_peer_list: vec![],
            bucket_size: 100,
        }
    }
}

/// Capacities of the two rating caches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeersRatingConfig {
    pub top_rated_cache_capacity: usize,
    pub bad_rated_cache_capacity: usize,
}

impl Default for PeersRatingConfig {
    fn default() -> Self {
        Self {
            top_rated_cache_capacity: 5000,
            bad_rated_cache_capacity: 5000,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: uuid::Uuid::new_v4().to_string(),
            network: NetworkConfig::default(),
            p2p: P2pConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            connection_watcher_type: ConnectionWatcherType::Disabled,
            connection_watcher_ttl_in_sec: 300,
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = NodeConfig::default();

        // Node ID
        if let Some(node_id) = lookup("NODE_ID") {
            config.node_id = node_id;
        }

        // Network port
        if let Some(port) = lookup("PORT") {
            config.network.port = port
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", format!("{port} is not a port")))?;
        }

        if let Some(kind) = lookup("CONNECTION_WATCHER_TYPE") {
            config.network.connection_watcher_type = kind.parse()?;
        }

        // Initial peers
        if let Some(peers) = lookup("PEERS") {
            config.p2p.kad_dht_peer_discovery.initial_peer_list = peers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(kind) = lookup("SHARDING_TYPE") {
            config.p2p.sharding.sharding_type = kind.parse()?;
        }

        if let Some(target) = lookup("TARGET_PEER_COUNT") {
            config.p2p.sharding.target_peer_count = target.parse().map_err(|_| {
                ConfigError::invalid("TARGET_PEER_COUNT", format!("{target} is not a count"))
            })?;
        }

        if let Some(enabled) = lookup("DISCOVERY_ENABLED") {
            config.p2p.kad_dht_peer_discovery.enabled = enabled.parse().map_err(|_| {
                ConfigError::invalid("DISCOVERY_ENABLED", format!("{enabled} is not a bool"))
            })?;
        }

        if let Some(kind) = lookup("DISCOVERY_TYPE") {
            config.p2p.kad_dht_peer_discovery.dht_type = kind.parse()?;
        }

        if let Some(protocol_id) = lookup("PROTOCOL_ID") {
            config.p2p.kad_dht_peer_discovery.protocol_id = protocol_id;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no component could be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::invalid("node_id", "must not be empty"));
        }

        let sharding = &self.p2p.sharding;
        if sharding.sharding_type == ShardingType::ListsSharder
            && sharding.classified_quota() > u64::from(sharding.target_peer_count)
        {
            return Err(ConfigError::invalid(
                "sharding.target_peer_count",
                format!(
                    "{} is below the sum of the class quotas ({})",
                    sharding.target_peer_count,
                    sharding.classified_quota()
                ),
            ));
        }

        let discovery = &self.p2p.kad_dht_peer_discovery;
        if discovery.enabled {
            if discovery.refresh_interval_in_sec == 0 {
                return Err(ConfigError::invalid(
                    "kad_dht_peer_discovery.refresh_interval_in_sec",
                    "must be positive",
                ));
            }
            if discovery.routing_table_refresh_interval_in_sec == 0 {
                return Err(ConfigError::invalid(
                    "kad_dht_peer_discovery.routing_table_refresh_interval_in_sec",
                    "must be positive",
                ));
            }
            if discovery.protocol_id.is_empty() {
                return Err(ConfigError::invalid(
                    "kad_dht_peer_discovery.protocol_id",
                    "must not be empty",
                ));
            }
        }

        let rating = &self.p2p.peers_rating;
        if rating.top_rated_cache_capacity == 0 || rating.bad_rated_cache_capacity == 0 {
            return Err(ConfigError::invalid(
                "peers_rating",
                "cache capacities must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(!config.node_id.is_empty());
        assert_eq!(config.network.port, 8000);
        assert_eq!(config.p2p.sharding.sharding_type, ShardingType::ListsSharder);
        assert_eq!(config.p2p.sharding.classified_quota(), 29);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("NODE_ID", "node-7"),
            ("PORT", "9100"),
            ("PEERS", "/ip4/10.0.0.1/tcp/1, ,/ip4/10.0.0.2/tcp/2"),
            ("SHARDING_TYPE", "OneListSharder"),
            ("DISCOVERY_TYPE", "legacy"),
        ]))
        .unwrap();

        assert_eq!(config.node_id, "node-7");
        assert_eq!(config.network.port, 9100);
        assert_eq!(config.p2p.kad_dht_peer_discovery.initial_peer_list.len(), 2);
        assert_eq!(config.p2p.sharding.sharding_type, ShardingType::OneListSharder);
        assert_eq!(config.p2p.kad_dht_peer_discovery.dht_type, KadDhtType::Legacy);
    }

    #[test]
    fn test_unknown_types_fail_fast() {
        let err = NodeConfig::from_lookup(lookup(&[("SHARDING_TYPE", "unknown")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { kind: "sharding", .. }));

        let err = NodeConfig::from_lookup(lookup(&[("DISCOVERY_TYPE", "fast")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownType { .. }));

        let err = NodeConfig::from_lookup(lookup(&[("PORT", "ninety")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "PORT", .. }));
    }

    #[test]
    fn test_quotas_above_target_rejected() {
        let mut config = NodeConfig::default();
        config.p2p.sharding.target_peer_count = 10;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "sharding.target_peer_count", .. })
        ));

        config.p2p.sharding.sharding_type = ShardingType::OneListSharder;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config = NodeConfig::from_json(
            r#"{
                "node_id": "node-1",
                "p2p": {
                    "sharding": { "type": "NilListSharder" },
                    "kad_dht_peer_discovery": { "type": "legacy", "bucket_size": 20 }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.node_id, "node-1");
        assert_eq!(config.p2p.sharding.sharding_type, ShardingType::NilListSharder);
        assert_eq!(config.p2p.sharding.target_peer_count, 36);
        assert_eq!(config.p2p.kad_dht_peer_discovery.bucket_size, 20);
        assert_eq!(config.p2p.kad_dht_peer_discovery.refresh_interval_in_sec, 10);

        let err = NodeConfig::from_json(r#"{ "p2p": { "sharding": { "type": "Bogus" } } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn test_watcher_type_from_json() {
        let parse = |value: &str| {
            NodeConfig::from_json(&format!(
                r#"{{ "network": {{ "connection_watcher_type": "{value}" }} }}"#
            ))
            .map(|config| config.network.connection_watcher_type)
        };

        assert_eq!(parse("").unwrap(), ConnectionWatcherType::Disabled);
        assert_eq!(parse("disabled").unwrap(), ConnectionWatcherType::Disabled);
        assert_eq!(parse("print").unwrap(), ConnectionWatcherType::Print);
        assert!(parse("loud").is_err());
    }
}
