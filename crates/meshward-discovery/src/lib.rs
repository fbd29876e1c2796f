//! Meshward Discovery - Kad-DHT peer discovery
//!
//! Finds peers through a Kademlia DHT, keeps the seeders connected and lets
//! the sharder decide which connections survive.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                PeerDiscoverer                │
//! │   (Nil / Continuous / Optimized Kad-DHT)     │
//! └───────────┬───────────────────────┬──────────┘
//!             │ builds                │ dials seeders
//!             ▼                       ▼
//! ┌──────────────────────┐  ┌────────────────────────────────┐
//! │    KadDhtHandler     │─▶│  HostWithConnectionManagement  │
//! └──────────────────────┘  │  (Sharder + ConnectionsWatcher)│
//!                           └───────────────┬────────────────┘
//!                                           ▼
//!                                   ConnectableHost
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use meshward_discovery::{new_peer_discoverer, PeerDiscovererArgs};
//!
//! let discoverer = new_peer_discoverer(args)?;
//! discoverer.bootstrap()?;
//! discoverer.wait_for_initialization().await;
//! ```

// Core modules
mod error;
mod host;
mod kad_dht;
mod state;

mod connection_management;
mod connections_watcher;
mod context;
mod denial;
mod loops;

// Discoverers
mod continuous;
mod factory;
mod nil;
mod optimized;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports: Error types
pub use error::DiscoveryError;

// Re-exports: Collaborator contracts
pub use host::{ConnectableHost, ConnectionEvent, ConnectionInfo};
pub use kad_dht::{KadDhtBuilder, KadDhtHandler, KadDhtOptions};

// Re-exports: Connection management
pub use connection_management::HostWithConnectionManagement;
pub use connections_watcher::{
    log_print_handler, new_connections_watcher, ConnectionsWatcher, DisabledConnectionsWatcher,
    PrintConnectionsWatcher, PrintHandler, MIN_TIME_TO_LIVE,
};
pub use denial::{DisabledPeerDenialEvaluator, PeerDenialEvaluator, TimedPeerDenialEvaluator};

// Re-exports: Discoverers
pub use context::PeerDiscovererArgs;
pub use continuous::{ContinuousKadDhtDiscoverer, KAD_DHT_DISCOVERY_NAME};
pub use factory::{new_peer_discoverer, PeerDiscoverer};
pub use nil::{NilDiscoverer, NIL_DISCOVERY_NAME};
pub use optimized::{
    OptimizedKadDhtDiscoverer, MIN_SEEDERS_RECONNECTION_INTERVAL, OPTIMIZED_KAD_DHT_DISCOVERY_NAME,
};
pub use state::{wait_for_outcome, DiscovererState};
