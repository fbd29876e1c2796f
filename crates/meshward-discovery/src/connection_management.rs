//! Host connection management
//!
//! Wraps the transport host so that the sharder decides who stays
//! connected. Dials are refused for denied peers and for peers the sharder
//! would drop right away. Every new connection triggers an eviction pass,
//! which also disconnects denied peers.
//!
//! ```text
//!   ConnectionEvent::Connected
//!            │
//!            ▼
//!   ConnectionsWatcher ──▶ reconcile() ──▶ Sharder::compute_eviction_list
//!                               │
//!                               ▼
//!                      ConnectableHost::close_peer
//! ```

use futures::future::join_all;
use meshward_sharding::Sharder;
use meshward_types::PeerId;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::connections_watcher::ConnectionsWatcher;
use crate::denial::PeerDenialEvaluator;
use crate::error::DiscoveryError;
use crate::host::{ConnectableHost, ConnectionEvent};

pub struct HostWithConnectionManagement {
    host: Arc<dyn ConnectableHost>,
    sharder: Arc<Sharder>,
    watcher: Arc<dyn ConnectionsWatcher>,
    denial: Arc<dyn PeerDenialEvaluator>,
    /// Acceptance checks take it shared, eviction passes exclusively
    eviction: RwLock<()>,
    span: Span,
}

impl HostWithConnectionManagement {
    pub fn new(
        host: Arc<dyn ConnectableHost>,
        sharder: Arc<Sharder>,
        watcher: Arc<dyn ConnectionsWatcher>,
        denial: Arc<dyn PeerDenialEvaluator>,
        span: Span,
    ) -> Self {
        Self {
            host,
            sharder,
            watcher,
            denial,
            eviction: RwLock::new(()),
            span,
        }
    }

    pub fn id(&self) -> PeerId {
        self.host.id()
    }

    pub fn sharder(&self) -> &Arc<Sharder> {
        &self.sharder
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        self.host.connected_peers()
    }

    pub fn is_connected(&self, pid: &PeerId) -> bool {
        self.host.is_connected(pid)
    }

    /// Whether `pid` would survive the next eviction pass if connected
    pub fn can_connect_to_peer(&self, pid: &PeerId) -> bool {
        if self.denial.is_denied(pid) {
            return false;
        }

        let mut connected = self.host.connected_peers();
        if connected.contains(pid) {
            return true;
        }
        connected.push(pid.clone());

        let evicted = self.sharder.compute_eviction_list(&connected);
        !self.sharder.has(pid, &evicted)
    }

    /// Dial `address`, refusing denied peers and peers the sharder would
    /// evict immediately
    ///
    /// Addresses without a `/p2p/<id>` suffix are dialed unchecked and left
    /// to the eviction pass that follows the connection.
    pub async fn connect_to_peer(&self, address: &str) -> Result<PeerId, DiscoveryError> {
        if let Some(pid) = PeerId::from_address(address) {
            let _guard = self.eviction.read().await;
            if self.denial.is_denied(&pid) {
                debug!(parent: &self.span, pid = %pid, "Refusing to dial denied peer");
                return Err(DiscoveryError::PeerDenied(pid));
            }
            if !self.can_connect_to_peer(&pid) {
                debug!(parent: &self.span, pid = %pid, "Refusing to dial peer over budget");
                return Err(DiscoveryError::PeerNotAcceptable(pid));
            }
        }

        self.host.connect_to_peer(address).await
    }

    pub async fn close_peer(&self, pid: &PeerId) -> Result<(), DiscoveryError> {
        self.host.close_peer(pid).await
    }

    /// Disconnect denied peers and every peer the sharder puts on the
    /// eviction list
    pub async fn reconcile(&self) -> Vec<PeerId> {
        let _guard = self.eviction.write().await;

        let connected = self.host.connected_peers();
        let (denied, allowed): (Vec<PeerId>, Vec<PeerId>) = connected
            .iter()
            .cloned()
            .partition(|pid| self.denial.is_denied(pid));
        let mut evicted = self.sharder.compute_eviction_list(&allowed);
        if evicted.is_empty() && denied.is_empty() {
            return evicted;
        }

        info!(
            parent: &self.span,
            sharder = self.sharder.name(),
            connected = connected.len(),
            over_budget = evicted.len(),
            denied = denied.len(),
            "Evicting peers"
        );
        evicted.extend(denied);

        let results = join_all(evicted.iter().map(|pid| self.host.close_peer(pid))).await;
        for (pid, result) in evicted.iter().zip(results) {
            if let Err(err) = result {
                warn!(parent: &self.span, pid = %pid, error = %err, "Failed to close evicted peer");
            }
        }

        evicted
    }

    /// Watch connection events until `cancel` fires or the host goes away
    ///
    /// The subscription is taken before returning, so no event emitted
    /// after this call is missed.
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        runtime: &Handle,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut events = self.host.subscribe();
        let this = self.clone();
        let span = self.span.clone();

        runtime.spawn(
            async move {
                loop {
                    let event = tokio::select! {
                        _ = cancel.cancelled() => break,
                        event = events.recv() => event,
                    };

                    match event {
                        Ok(ConnectionEvent::Connected(info)) => {
                            this.watcher
                                .new_known_connection(&info.peer, &info.remote_address);
                            this.reconcile().await;
                        }
                        Ok(ConnectionEvent::Disconnected(pid)) => {
                            trace!(pid = %pid, "Peer disconnected");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Connection events lagged, running full eviction pass");
                            this.reconcile().await;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                debug!("Connection management loop ended");
            }
            .instrument(span),
        )
    }
}
