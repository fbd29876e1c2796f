//! State shared by the Kad-DHT discoverers and their tasks

use meshward_core::KadDhtPeerDiscoveryConfig;
use meshward_sharding::Sharder;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument, Span};

use crate::connection_management::HostWithConnectionManagement;
use crate::connections_watcher::ConnectionsWatcher;
use crate::denial::PeerDenialEvaluator;
use crate::error::DiscoveryError;
use crate::host::ConnectableHost;
use crate::kad_dht::{KadDhtBuilder, KadDhtHandler, KadDhtOptions};
use crate::loops::run_periodic;
use crate::state::{wait_for_outcome, DiscovererState, StateSignal};

/// Arguments for every discoverer constructor and `new_peer_discoverer`
pub struct PeerDiscovererArgs {
    pub host: Arc<dyn ConnectableHost>,
    pub sharder: Arc<Sharder>,
    pub config: KadDhtPeerDiscoveryConfig,
    pub watcher: Arc<dyn ConnectionsWatcher>,
    pub denial: Arc<dyn PeerDenialEvaluator>,
    pub builder: Arc<dyn KadDhtBuilder>,
    pub span: Span,
}

pub(crate) struct DiscovererContext {
    pub runtime: Handle,
    pub host: Arc<HostWithConnectionManagement>,
    pub builder: Arc<dyn KadDhtBuilder>,
    pub config: KadDhtPeerDiscoveryConfig,
    pub state: StateSignal,
    pub kad_dht: Mutex<Option<Arc<dyn KadDhtHandler>>>,
    pub cancel: CancellationToken,
    pub initial_connection: watch::Sender<bool>,
    pub span: Span,
}

impl DiscovererContext {
    /// Validate the arguments and start connection reconciliation
    pub fn new(args: PeerDiscovererArgs) -> Result<Arc<Self>, DiscoveryError> {
        let runtime = Handle::try_current().map_err(|_| DiscoveryError::NoRuntime)?;
        check_positive("refresh interval", args.config.refresh_interval())?;
        check_positive(
            "routing table refresh interval",
            args.config.routing_table_refresh_interval(),
        )?;

        let host = Arc::new(HostWithConnectionManagement::new(
            args.host,
            args.sharder,
            args.watcher,
            args.denial,
            args.span.clone(),
        ));
        let (initial_connection, _) = watch::channel(false);
        let context = Arc::new(Self {
            runtime,
            host,
            builder: args.builder,
            config: args.config,
            state: StateSignal::new(),
            kad_dht: Mutex::new(None),
            cancel: CancellationToken::new(),
            initial_connection,
            span: args.span,
        });

        context
            .host
            .spawn_event_loop(&context.runtime, context.cancel.clone());
        Ok(context)
    }

    pub fn kad_dht_options(&self) -> KadDhtOptions {
        KadDhtOptions {
            protocol_id: self.config.protocol_id.clone(),
            bucket_size: self.config.bucket_size,
            routing_table_refresh: self.config.routing_table_refresh_interval(),
        }
    }

    /// Build and install the DHT handler; failures are published as `Error`
    pub async fn create_kad_dht(&self) -> Option<Arc<dyn KadDhtHandler>> {
        let kad_dht = match self.builder.build(self.host.clone(), &self.kad_dht_options()).await {
            Ok(kad_dht) => kad_dht,
            Err(err) => {
                warn!(error = %err, "Kad-DHT initialization failed");
                self.state.set(DiscovererState::Error(err));
                return None;
            }
        };

        let mut slot = self.kad_dht.lock().await;
        if self.cancel.is_cancelled() {
            // Stopped while building, nobody else will close it
            drop(slot);
            if let Err(err) = kad_dht.close().await {
                warn!(error = %err, "Failed to close Kad-DHT after stop");
            }
            return None;
        }
        *slot = Some(kad_dht.clone());
        drop(slot);

        self.state.set(DiscovererState::Initialized);
        info!(protocol_id = %self.config.protocol_id, "Kad-DHT initialized");
        Some(kad_dht)
    }

    /// Refresh the routing table on its own task
    pub fn spawn_routing_table_refresh(&self, kad_dht: Arc<dyn KadDhtHandler>) {
        let cancel = self.cancel.clone();
        let interval = self.config.routing_table_refresh_interval();
        self.runtime.spawn(
            async move {
                run_periodic("routing table refresh", interval, &cancel, || {
                    kad_dht.refresh_routing_table()
                })
                .await;
            }
            .instrument(self.span.clone()),
        );
    }

    pub fn state(&self) -> DiscovererState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DiscovererState> {
        self.state.subscribe()
    }

    pub async fn wait_for_initialization(&self) -> DiscovererState {
        wait_for_outcome(self.state.subscribe()).await
    }

    /// Wait until one initial peer answered; false if stopped first
    pub async fn wait_for_initial_connection(&self) -> bool {
        let mut rx = self.initial_connection.subscribe();
        let connected = tokio::select! {
            result = rx.wait_for(|connected| *connected) => result.is_ok(),
            _ = self.cancel.cancelled() => false,
        };
        connected || *self.initial_connection.borrow()
    }

    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        self.cancel.cancel();
        self.state.stop();

        let kad_dht = self.kad_dht.lock().await.take();
        match kad_dht {
            Some(kad_dht) => kad_dht.close().await,
            None => Ok(()),
        }
    }
}

fn check_positive(field: &str, interval: Duration) -> Result<(), DiscoveryError> {
    if interval.is_zero() {
        return Err(DiscoveryError::InvalidValue(format!("{field} must be positive")));
    }
    Ok(())
}
