//! Discoverer factory
//!
//! Builds the `PeerDiscoverer` variant named by the discovery configuration.

use meshward_core::KadDhtType;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::connection_management::HostWithConnectionManagement;
use crate::context::PeerDiscovererArgs;
use crate::continuous::ContinuousKadDhtDiscoverer;
use crate::error::DiscoveryError;
use crate::nil::NilDiscoverer;
use crate::optimized::OptimizedKadDhtDiscoverer;
use crate::state::DiscovererState;

/// Discovery strategy selected by configuration
pub enum PeerDiscoverer {
    Nil(NilDiscoverer),
    Continuous(ContinuousKadDhtDiscoverer),
    Optimized(OptimizedKadDhtDiscoverer),
}

impl PeerDiscoverer {
    pub fn bootstrap(&self) -> Result<(), DiscoveryError> {
        match self {
            PeerDiscoverer::Nil(discoverer) => discoverer.bootstrap(),
            PeerDiscoverer::Continuous(discoverer) => discoverer.bootstrap(),
            PeerDiscoverer::Optimized(discoverer) => discoverer.bootstrap(),
        }
    }

    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        match self {
            PeerDiscoverer::Nil(_) => Ok(()),
            PeerDiscoverer::Continuous(discoverer) => discoverer.stop().await,
            PeerDiscoverer::Optimized(discoverer) => discoverer.stop().await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PeerDiscoverer::Nil(discoverer) => discoverer.name(),
            PeerDiscoverer::Continuous(discoverer) => discoverer.name(),
            PeerDiscoverer::Optimized(discoverer) => discoverer.name(),
        }
    }

    /// Managed host; `None` when discovery is disabled
    pub fn host(&self) -> Option<&Arc<HostWithConnectionManagement>> {
        match self {
            PeerDiscoverer::Nil(_) => None,
            PeerDiscoverer::Continuous(discoverer) => Some(discoverer.host()),
            PeerDiscoverer::Optimized(discoverer) => Some(discoverer.host()),
        }
    }

    /// Lifecycle state; `None` when discovery is disabled
    pub fn state(&self) -> Option<DiscovererState> {
        match self {
            PeerDiscoverer::Nil(_) => None,
            PeerDiscoverer::Continuous(discoverer) => Some(discoverer.state()),
            PeerDiscoverer::Optimized(discoverer) => Some(discoverer.state()),
        }
    }

    pub fn subscribe_state(&self) -> Option<watch::Receiver<DiscovererState>> {
        match self {
            PeerDiscoverer::Nil(_) => None,
            PeerDiscoverer::Continuous(discoverer) => Some(discoverer.subscribe_state()),
            PeerDiscoverer::Optimized(discoverer) => Some(discoverer.subscribe_state()),
        }
    }

    pub async fn wait_for_initialization(&self) -> Option<DiscovererState> {
        match self {
            PeerDiscoverer::Nil(_) => None,
            PeerDiscoverer::Continuous(discoverer) => Some(discoverer.wait_for_initialization().await),
            PeerDiscoverer::Optimized(discoverer) => Some(discoverer.wait_for_initialization().await),
        }
    }

    /// Wait for the first initial peer; immediate when discovery is disabled
    pub async fn wait_for_initial_connection(&self) -> bool {
        match self {
            PeerDiscoverer::Nil(_) => true,
            PeerDiscoverer::Continuous(discoverer) => discoverer.wait_for_initial_connection().await,
            PeerDiscoverer::Optimized(discoverer) => discoverer.wait_for_initial_connection().await,
        }
    }
}

/// Create the discoverer selected by `args.config`
pub fn new_peer_discoverer(args: PeerDiscovererArgs) -> Result<PeerDiscoverer, DiscoveryError> {
    if !args.config.enabled {
        debug!(parent: &args.span, "Peer discovery disabled");
        return Ok(PeerDiscoverer::Nil(NilDiscoverer::new()));
    }

    match args.config.dht_type {
        KadDhtType::Legacy => {
            debug!(parent: &args.span, "Using continuous kad-dht discovery");
            Ok(PeerDiscoverer::Continuous(ContinuousKadDhtDiscoverer::new(args)?))
        }
        KadDhtType::Optimized => {
            debug!(parent: &args.span, "Using optimized kad-dht discovery");
            Ok(PeerDiscoverer::Optimized(OptimizedKadDhtDiscoverer::new(args)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections_watcher::DisabledConnectionsWatcher;
    use crate::denial::DisabledPeerDenialEvaluator;
    use crate::continuous::KAD_DHT_DISCOVERY_NAME;
    use crate::nil::NIL_DISCOVERY_NAME;
    use crate::optimized::OPTIMIZED_KAD_DHT_DISCOVERY_NAME;
    use crate::testing::{TestHost, TestKadDhtBuilder};
    use meshward_core::KadDhtPeerDiscoveryConfig;
    use meshward_sharding::NilListSharder;
    use meshward_types::PeerId;
    use tokio_test::block_on;
    use tracing::Span;

    fn create_args(config: KadDhtPeerDiscoveryConfig) -> PeerDiscovererArgs {
        PeerDiscovererArgs {
            host: Arc::new(TestHost::new(PeerId::from("self"))),
            sharder: Arc::new(NilListSharder::new().into()),
            config,
            watcher: Arc::new(DisabledConnectionsWatcher::new()),
            denial: Arc::new(DisabledPeerDenialEvaluator::new()),
            builder: Arc::new(TestKadDhtBuilder::new()),
            span: Span::none(),
        }
    }

    #[test]
    fn test_disabled_discovery() {
        let config = KadDhtPeerDiscoveryConfig {
            enabled: false,
            ..KadDhtPeerDiscoveryConfig::default()
        };

        // No runtime needed for the nil variant
        let discoverer = new_peer_discoverer(create_args(config)).unwrap();
        assert!(matches!(discoverer, PeerDiscoverer::Nil(_)));
        assert_eq!(discoverer.name(), NIL_DISCOVERY_NAME);
        assert!(discoverer.state().is_none());
        assert!(discoverer.host().is_none());
        assert!(discoverer.bootstrap().is_ok());
        assert!(block_on(discoverer.wait_for_initial_connection()));
        assert!(block_on(discoverer.stop()).is_ok());
    }

    #[tokio::test]
    async fn test_legacy_discovery() {
        let config = KadDhtPeerDiscoveryConfig {
            dht_type: KadDhtType::Legacy,
            ..KadDhtPeerDiscoveryConfig::default()
        };

        let discoverer = new_peer_discoverer(create_args(config)).unwrap();
        assert!(matches!(discoverer, PeerDiscoverer::Continuous(_)));
        assert_eq!(discoverer.name(), KAD_DHT_DISCOVERY_NAME);
        assert_eq!(discoverer.state(), Some(DiscovererState::NotInitialized));
        discoverer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_optimized_discovery() {
        let discoverer =
            new_peer_discoverer(create_args(KadDhtPeerDiscoveryConfig::default())).unwrap();
        assert!(matches!(discoverer, PeerDiscoverer::Optimized(_)));
        assert_eq!(discoverer.name(), OPTIMIZED_KAD_DHT_DISCOVERY_NAME);
        assert!(discoverer.host().is_some());

        discoverer.bootstrap().unwrap();
        assert_eq!(
            discoverer.wait_for_initialization().await,
            Some(DiscovererState::Initialized)
        );
        discoverer.stop().await.unwrap();
        assert_eq!(discoverer.state(), Some(DiscovererState::Stopped));
    }

    #[tokio::test]
    async fn test_invalid_optimized_config() {
        let config = KadDhtPeerDiscoveryConfig {
            seeders_reconnection_interval_in_sec: 0,
            ..KadDhtPeerDiscoveryConfig::default()
        };

        let result = new_peer_discoverer(create_args(config));
        assert!(matches!(
            result,
            Err(DiscoveryError::InvalidSeedersReconnectionInterval { .. })
        ));
    }
}
