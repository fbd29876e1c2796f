//! Optimized Kad-DHT discoverer
//!
//! A processing loop, started at construction, serves bootstrap requests.
//! Once the DHT is up, seeder maintenance, peer lookup and routing table
//! refresh each run on their own task, so a slow seeder never delays a
//! lookup.
//!
//! ```text
//! bootstrap() ──request──▶ processing loop ──▶ build Kad-DHT
//!                                                 │
//!                  ┌──────────────────────────────┼──────────────────────┐
//!                  ▼                              ▼                      ▼
//!          seeder maintenance              peer lookup         routing table refresh
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, Instrument};

use crate::connection_management::HostWithConnectionManagement;
use crate::context::{DiscovererContext, PeerDiscovererArgs};
use crate::error::DiscoveryError;
use crate::loops::{maintain_seeders, run_periodic};
use crate::state::DiscovererState;

pub const OPTIMIZED_KAD_DHT_DISCOVERY_NAME: &str = "optimized kad-dht discovery";

/// Shortest accepted seeders reconnection interval
pub const MIN_SEEDERS_RECONNECTION_INTERVAL: Duration = Duration::from_secs(1);

pub struct OptimizedKadDhtDiscoverer {
    context: Arc<DiscovererContext>,
    requests: mpsc::Sender<()>,
}

impl OptimizedKadDhtDiscoverer {
    pub fn new(args: PeerDiscovererArgs) -> Result<Self, DiscoveryError> {
        let interval = args.config.seeders_reconnection_interval();
        if interval < MIN_SEEDERS_RECONNECTION_INTERVAL {
            return Err(DiscoveryError::InvalidSeedersReconnectionInterval {
                actual: interval,
                minimum: MIN_SEEDERS_RECONNECTION_INTERVAL,
            });
        }

        let context = DiscovererContext::new(args)?;
        let (requests, rx) = mpsc::channel(1);
        context
            .runtime
            .spawn(process_loop(context.clone(), rx).instrument(context.span.clone()));

        debug!(
            parent: &context.span,
            refresh_interval = ?context.config.refresh_interval(),
            seeders_reconnection_interval = ?interval,
            seeders = context.config.initial_peer_list.len(),
            "Created optimized kad-dht discoverer"
        );
        Ok(Self { context, requests })
    }

    /// Ask the processing loop to initialize discovery
    ///
    /// A no-op while initializing or initialized; fails once stopped.
    pub fn bootstrap(&self) -> Result<(), DiscoveryError> {
        if !self.context.state.try_begin()? {
            return Ok(());
        }

        // Capacity 1 is enough, `try_begin` lets a single request through
        self.requests.try_send(()).map_err(|_| {
            self.context.state.set(DiscovererState::Error(DiscoveryError::Stopped));
            DiscoveryError::Stopped
        })
    }

    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        self.context.stop().await
    }

    pub fn name(&self) -> &'static str {
        OPTIMIZED_KAD_DHT_DISCOVERY_NAME
    }

    pub fn state(&self) -> DiscovererState {
        self.context.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<DiscovererState> {
        self.context.subscribe_state()
    }

    pub async fn wait_for_initialization(&self) -> DiscovererState {
        self.context.wait_for_initialization().await
    }

    pub async fn wait_for_initial_connection(&self) -> bool {
        self.context.wait_for_initial_connection().await
    }

    pub fn host(&self) -> &Arc<HostWithConnectionManagement> {
        &self.context.host
    }
}

impl Drop for OptimizedKadDhtDiscoverer {
    fn drop(&mut self) {
        self.context.cancel.cancel();
    }
}

async fn process_loop(context: Arc<DiscovererContext>, mut requests: mpsc::Receiver<()>) {
    loop {
        let request = tokio::select! {
            _ = context.cancel.cancelled() => break,
            request = requests.recv() => request,
        };
        if request.is_none() {
            break;
        }
        initialize(&context).await;
    }
    debug!("Optimized discovery processing loop ended");
}

async fn initialize(context: &Arc<DiscovererContext>) {
    let Some(kad_dht) = context.create_kad_dht().await else {
        return;
    };

    let seeders = context.config.initial_peer_list.clone();
    let interval = context.config.seeders_reconnection_interval();
    let host = context.host.clone();
    let cancel = context.cancel.clone();
    let initial_connection = context.initial_connection.clone();
    context.runtime.spawn(
        async move {
            maintain_seeders(&host, &seeders, interval, &cancel, &initial_connection).await;
        }
        .instrument(context.span.clone()),
    );

    let lookup_dht = kad_dht.clone();
    let refresh_interval = context.config.refresh_interval();
    let cancel = context.cancel.clone();
    context.runtime.spawn(
        async move {
            run_periodic("peer lookup", refresh_interval, &cancel, || {
                lookup_dht.bootstrap()
            })
            .await;
        }
        .instrument(context.span.clone()),
    );

    context.spawn_routing_table_refresh(kad_dht);
}
