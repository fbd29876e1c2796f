//! Kad-DHT handler contract
//!
//! The DHT wire protocol lives outside this crate. A builder turns the
//! connection managed host into a running handler once discovery starts.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::connection_management::HostWithConnectionManagement;
use crate::error::DiscoveryError;

/// Options handed to the DHT builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KadDhtOptions {
    pub protocol_id: String,
    pub bucket_size: u32,
    pub routing_table_refresh: Duration,
}

#[async_trait]
pub trait KadDhtHandler: Send + Sync {
    /// Run one lookup round against the network
    async fn bootstrap(&self) -> Result<(), DiscoveryError>;

    async fn refresh_routing_table(&self) -> Result<(), DiscoveryError>;

    async fn close(&self) -> Result<(), DiscoveryError>;
}

#[async_trait]
pub trait KadDhtBuilder: Send + Sync {
    async fn build(
        &self,
        host: Arc<HostWithConnectionManagement>,
        options: &KadDhtOptions,
    ) -> Result<Arc<dyn KadDhtHandler>, DiscoveryError>;
}
