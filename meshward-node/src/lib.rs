//! Meshward Node - Peer membership for a network node
//!
//! The membership node is responsible for:
//! - Keeping the connected peer set within the sharding budgets
//! - Discovering peers through the Kad-DHT and keeping seeders connected
//! - Rating peers and picking the best ones for outgoing requests
//! - Temporarily denying misbehaving peers

use anyhow::Context;
use meshward_core::{NodeConfig, PeerShardResolver, PreferredPeersHolder};
use meshward_discovery::{
    new_connections_watcher, new_peer_discoverer, ConnectableHost, ConnectionsWatcher,
    KadDhtBuilder, PeerDenialEvaluator, PeerDiscoverer, PeerDiscovererArgs,
    TimedPeerDenialEvaluator,
};
use meshward_rating::PeersRatingHandler;
use meshward_sharding::{new_sharder, Sharder, SharderFactoryArgs};
use meshward_types::PeerId;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, Span};

/// Collaborators provided by the embedding application
pub struct NodeDependencies {
    pub host: Arc<dyn ConnectableHost>,
    pub kad_dht_builder: Arc<dyn KadDhtBuilder>,
    pub peer_resolver: Arc<dyn PeerShardResolver>,
    pub preferred_peers: Arc<dyn PreferredPeersHolder>,
}

/// Peer membership node
pub struct MembershipNode {
    config: NodeConfig,
    sharder: Arc<Sharder>,
    rating: Arc<PeersRatingHandler>,
    watcher: Arc<dyn ConnectionsWatcher>,
    denial: Arc<TimedPeerDenialEvaluator>,
    discoverer: PeerDiscoverer,
    span: Span,
}

impl MembershipNode {
    /// Create a new membership node; discovery waits for `start`
    pub fn new(config: NodeConfig, deps: NodeDependencies) -> anyhow::Result<Self> {
        config.validate().context("invalid node configuration")?;

        let span = info_span!("membership", node_id = %config.node_id);
        let self_peer_id = deps.host.id();

        let watcher = new_connections_watcher(
            config.network.connection_watcher_type,
            Duration::from_secs(u64::from(config.network.connection_watcher_ttl_in_sec)),
            span.clone(),
        )
        .context("failed to create connections watcher")?;

        let sharder = new_sharder(SharderFactoryArgs {
            peer_resolver: deps.peer_resolver,
            self_peer_id: self_peer_id.clone(),
            config: config.p2p.sharding.clone(),
            preferred_peers: deps.preferred_peers,
            span: span.clone(),
        })
        .context("failed to create sharder")?;
        let sharder = Arc::new(sharder);

        let rating = PeersRatingHandler::from_config(&config.p2p.peers_rating, span.clone())
            .context("failed to create peers rating handler")?;

        let denial = Arc::new(TimedPeerDenialEvaluator::new(span.clone()));

        let discoverer = new_peer_discoverer(PeerDiscovererArgs {
            host: deps.host,
            sharder: sharder.clone(),
            config: config.p2p.kad_dht_peer_discovery.clone(),
            watcher: watcher.clone(),
            denial: denial.clone(),
            builder: deps.kad_dht_builder,
            span: span.clone(),
        })
        .context("failed to create peer discoverer")?;

        info!(
            parent: &span,
            peer_id = %self_peer_id,
            sharder = sharder.name(),
            discovery = discoverer.name(),
            "Creating membership node"
        );

        Ok(Self {
            config,
            sharder,
            rating: Arc::new(rating),
            watcher,
            denial,
            discoverer,
            span,
        })
    }

    /// Start peer discovery in the background
    pub fn start(&self) -> anyhow::Result<()> {
        self.discoverer
            .bootstrap()
            .context("failed to bootstrap peer discovery")?;

        info!(
            parent: &self.span,
            port = self.config.network.port,
            initial_peers = self.config.p2p.kad_dht_peer_discovery.initial_peer_list.len(),
            "Membership node started"
        );
        Ok(())
    }

    /// Stop discovery and the connections watcher
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        let stopped = self.discoverer.stop().await;
        let closed = self.watcher.close();
        stopped.context("failed to stop peer discovery")?;
        closed.context("failed to close connections watcher")?;

        info!(parent: &self.span, "Membership node stopped");
        Ok(())
    }

    /// Best rated `count` peers out of `candidates`
    pub fn select_peers(&self, candidates: &[PeerId], count: usize) -> Vec<PeerId> {
        self.rating.get_top_rated_peers_from_list(candidates, count)
    }

    /// Refuse and disconnect `pid` for `duration`
    ///
    /// With discovery disabled the peer is only recorded as denied.
    pub async fn deny_peer(&self, pid: &PeerId, duration: Duration) -> anyhow::Result<()> {
        self.denial
            .upsert_peer_id(pid, duration)
            .context("failed to deny peer")?;

        if let Some(host) = self.discoverer.host() {
            host.reconcile().await;
        }
        info!(parent: &self.span, pid = %pid, ?duration, "Peer denied");
        Ok(())
    }

    pub fn is_denied(&self, pid: &PeerId) -> bool {
        self.denial.is_denied(pid)
    }

    pub fn rating(&self) -> &Arc<PeersRatingHandler> {
        &self.rating
    }

    pub fn sharder(&self) -> &Arc<Sharder> {
        &self.sharder
    }

    pub fn discoverer(&self) -> &PeerDiscoverer {
        &self.discoverer
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Get node ID
    pub fn node_id(&self) -> &str {
        &self.config.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshward_core::{KadDhtPeerDiscoveryConfig, PreferredPeers, UnknownPeerShardResolver};
    use meshward_discovery::testing::{TestHost, TestKadDhtBuilder};

    fn create_dependencies() -> NodeDependencies {
        NodeDependencies {
            host: Arc::new(TestHost::new(PeerId::from("self"))),
            kad_dht_builder: Arc::new(TestKadDhtBuilder::new()),
            peer_resolver: Arc::new(UnknownPeerShardResolver),
            preferred_peers: Arc::new(PreferredPeers::default()),
        }
    }

    #[test]
    fn test_node_creation_without_discovery() {
        let mut config = NodeConfig::default();
        config.p2p.kad_dht_peer_discovery = KadDhtPeerDiscoveryConfig {
            enabled: false,
            ..KadDhtPeerDiscoveryConfig::default()
        };

        let node = MembershipNode::new(config, create_dependencies()).unwrap();
        assert!(!node.node_id().is_empty());
        assert_eq!(node.discoverer().name(), meshward_discovery::NIL_DISCOVERY_NAME);
        assert_eq!(node.sharder().name(), meshward_sharding::LISTS_SHARDER_NAME);
        assert!(node.start().is_ok());
    }

    #[tokio::test]
    async fn test_deny_peer_without_discovery() {
        let mut config = NodeConfig::default();
        config.p2p.kad_dht_peer_discovery.enabled = false;
        let node = MembershipNode::new(config, create_dependencies()).unwrap();
        let pid = PeerId::from("spammer");

        node.deny_peer(&pid, Duration::from_secs(60)).await.unwrap();
        assert!(node.is_denied(&pid));
        assert!(!node.is_denied(&PeerId::from("honest")));
        assert!(node.deny_peer(&pid, Duration::ZERO).await.is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = NodeConfig::default();
        config.p2p.sharding.target_peer_count = 1;

        let result = MembershipNode::new(config, create_dependencies());
        assert!(result.is_err());
    }
}
