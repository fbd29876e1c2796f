//! Transport host contract
//!
//! The host owns dialing, listening and stream multiplexing. Discovery only
//! needs to dial addresses, list and close connections, and hear about
//! connection changes.

use async_trait::async_trait;
use meshward_types::PeerId;
use tokio::sync::broadcast;

use crate::error::DiscoveryError;

/// A freshly established connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub peer: PeerId,
    /// Remote address as reported by the transport, may be empty
    pub remote_address: String,
}

/// Connection lifecycle notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected(ConnectionInfo),
    Disconnected(PeerId),
}

#[async_trait]
pub trait ConnectableHost: Send + Sync {
    /// Identity of the local node
    fn id(&self) -> PeerId;

    /// Dial `address` and return the identity of the remote peer
    async fn connect_to_peer(&self, address: &str) -> Result<PeerId, DiscoveryError>;

    /// Snapshot of the currently connected peers
    fn connected_peers(&self) -> Vec<PeerId>;

    fn is_connected(&self, pid: &PeerId) -> bool {
        self.connected_peers().contains(pid)
    }

    async fn close_peer(&self, pid: &PeerId) -> Result<(), DiscoveryError>;

    /// Receive connection events from now on
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;
}
