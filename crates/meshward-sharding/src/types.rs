//! Common types for the sharding module
//!
//! Centralizes bucket and quota definitions shared by the sharders.

use meshward_core::ShardingConfig;
use std::fmt;

use crate::error::ShardingError;

/// Sharder name reported by `ListsSharder`
pub const LISTS_SHARDER_NAME: &str = "lists sharder";

/// Sharder name reported by `OneListSharder`
pub const ONE_LIST_SHARDER_NAME: &str = "one list sharder";

/// Sharder name reported by `NilListSharder`
pub const NIL_LIST_SHARDER_NAME: &str = "nil list sharder";

/// Class a connected peer falls in when computing evictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerBucket {
    IntraShardValidators,
    CrossShardValidators,
    IntraShardObservers,
    CrossShardObservers,
    Seeders,
    Unknown,
}

impl PeerBucket {
    /// All buckets, in the order evictions are computed
    pub const ALL: [PeerBucket; 6] = [
        PeerBucket::IntraShardValidators,
        PeerBucket::CrossShardValidators,
        PeerBucket::IntraShardObservers,
        PeerBucket::CrossShardObservers,
        PeerBucket::Seeders,
        PeerBucket::Unknown,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PeerBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerBucket::IntraShardValidators => write!(f, "intra shard validators"),
            PeerBucket::CrossShardValidators => write!(f, "cross shard validators"),
            PeerBucket::IntraShardObservers => write!(f, "intra shard observers"),
            PeerBucket::CrossShardObservers => write!(f, "cross shard observers"),
            PeerBucket::Seeders => write!(f, "seeders"),
            PeerBucket::Unknown => write!(f, "unknown"),
        }
    }
}

/// Per-bucket connection budgets, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardingQuotas {
    pub target_peer_count: usize,
    pub max_intra_shard_validators: usize,
    pub max_cross_shard_validators: usize,
    pub max_intra_shard_observers: usize,
    pub max_cross_shard_observers: usize,
    pub max_seeders: usize,
    /// Whatever the target leaves after the classified quotas
    pub max_unknown: usize,
}

impl ShardingQuotas {
    /// Derive the quotas, rejecting class quotas that do not fit in the target
    pub fn from_config(config: &ShardingConfig) -> Result<Self, ShardingError> {
        let classified = config.classified_quota();
        let target = u64::from(config.target_peer_count);
        if classified > target {
            return Err(ShardingError::InvalidConfig(format!(
                "target peer count {} is below the sum of the class quotas {}",
                target, classified
            )));
        }

        Ok(Self {
            target_peer_count: config.target_peer_count as usize,
            max_intra_shard_validators: config.max_intra_shard_validators as usize,
            max_cross_shard_validators: config.max_cross_shard_validators as usize,
            max_intra_shard_observers: config.max_intra_shard_observers as usize,
            max_cross_shard_observers: config.max_cross_shard_observers as usize,
            max_seeders: config.max_seeders as usize,
            max_unknown: (target - classified) as usize,
        })
    }

    /// Budget of a bucket; `0` admits nobody
    pub fn quota_for(&self, bucket: PeerBucket) -> usize {
        match bucket {
            PeerBucket::IntraShardValidators => self.max_intra_shard_validators,
            PeerBucket::CrossShardValidators => self.max_cross_shard_validators,
            PeerBucket::IntraShardObservers => self.max_intra_shard_observers,
            PeerBucket::CrossShardObservers => self.max_cross_shard_observers,
            PeerBucket::Seeders => self.max_seeders,
            PeerBucket::Unknown => self.max_unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotas_from_default_config() {
        let quotas = ShardingQuotas::from_config(&ShardingConfig::default()).unwrap();
        assert_eq!(quotas.target_peer_count, 36);
        assert_eq!(quotas.max_unknown, 7);
        assert_eq!(quotas.quota_for(PeerBucket::CrossShardValidators), 15);
    }

    #[test]
    fn test_quotas_above_target() {
        let config = ShardingConfig {
            target_peer_count: 5,
            ..ShardingConfig::default()
        };
        assert!(matches!(
            ShardingQuotas::from_config(&config),
            Err(ShardingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bucket_indexes_are_dense() {
        for (expected, bucket) in PeerBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), expected);
        }
    }
}
