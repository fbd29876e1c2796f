//! Continuous Kad-DHT discoverer
//!
//! The legacy discovery flow. One background task builds the DHT, connects
//! to one initial peer and then runs a peer lookup every refresh interval.
//! The routing table refresh runs on its own task.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, Instrument};

use crate::connection_management::HostWithConnectionManagement;
use crate::context::{DiscovererContext, PeerDiscovererArgs};
use crate::error::DiscoveryError;
use crate::loops::{connect_to_one_initial_peer, run_periodic};
use crate::state::DiscovererState;

pub const KAD_DHT_DISCOVERY_NAME: &str = "kad-dht discovery";

pub struct ContinuousKadDhtDiscoverer {
    context: Arc<DiscovererContext>,
}

impl ContinuousKadDhtDiscoverer {
    pub fn new(args: PeerDiscovererArgs) -> Result<Self, DiscoveryError> {
        let context = DiscovererContext::new(args)?;
        debug!(
            parent: &context.span,
            refresh_interval = ?context.config.refresh_interval(),
            initial_peers = context.config.initial_peer_list.len(),
            "Created continuous kad-dht discoverer"
        );
        Ok(Self { context })
    }

    /// Start discovery in the background
    ///
    /// A no-op while initializing or initialized; fails once stopped.
    pub fn bootstrap(&self) -> Result<(), DiscoveryError> {
        if !self.context.state.try_begin()? {
            return Ok(());
        }

        let context = self.context.clone();
        let span = context.span.clone();
        self.context
            .runtime
            .spawn(discover(context).instrument(span));
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), DiscoveryError> {
        self.context.stop().await
    }

    pub fn name(&self) -> &'static str {
        KAD_DHT_DISCOVERY_NAME
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

impl Drop for ContinuousKadDhtDiscoverer {
    fn drop(&mut self) {
        self.context.cancel.cancel();
    }
}

async fn discover(context: Arc<DiscovererContext>) {
    let Some(kad_dht) = context.create_kad_dht().await else {
        return;
    };
    context.spawn_routing_table_refresh(kad_dht.clone());

    let connected = connect_to_one_initial_peer(
        &context.host,
        &context.config.initial_peer_list,
        context.config.refresh_interval(),
        &context.cancel,
    )
    .await;
    if !connected {
        return;
    }
    context.initial_connection.send_replace(true);
    info!("Initial connection established, starting peer lookup");

    run_periodic("peer lookup", context.config.refresh_interval(), &context.cancel, || {
        kad_dht.bootstrap()
    })
    .await;
}
