//! In-memory doubles for the transport host and the DHT
//!
//! Available to this crate's tests and, through the `test-utils` feature,
//! to dependent crates.

use async_trait::async_trait;
use meshward_types::PeerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::connection_management::HostWithConnectionManagement;
use crate::error::DiscoveryError;
use crate::host::{ConnectableHost, ConnectionEvent, ConnectionInfo};
use crate::kad_dht::{KadDhtBuilder, KadDhtHandler, KadDhtOptions};

#[derive(Default)]
struct TestHostState {
    reachable: HashMap<String, PeerId>,
    connected: Vec<PeerId>,
    attempted: Vec<String>,
    closed: Vec<PeerId>,
}

/// Host dialing a fixed table of reachable addresses
pub struct TestHost {
    id: PeerId,
    state: Mutex<TestHostState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl TestHost {
    pub fn new(id: PeerId) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            id,
            state: Mutex::new(TestHostState::default()),
            events,
        }
    }

    pub fn add_reachable(&self, address: impl Into<String>, pid: PeerId) {
        self.state.lock().reachable.insert(address.into(), pid);
    }

    /// Simulate a remote peer dialing us
    pub fn accept_inbound(&self, pid: PeerId, remote_address: &str) {
        self.register_connection(pid, remote_address);
    }

    /// Simulate the remote side dropping the connection
    pub fn drop_connection(&self, pid: &PeerId) {
        let removed = {
            let mut state = self.state.lock();
            let before = state.connected.len();
            state.connected.retain(|connected| connected != pid);
            before != state.connected.len()
        };
        if removed {
            let _ = self.events.send(ConnectionEvent::Disconnected(pid.clone()));
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().attempted.len()
    }

    pub fn attempted_addresses(&self) -> Vec<String> {
        self.state.lock().attempted.clone()
    }

    /// Peers closed through `close_peer`, in call order
    pub fn closed_peers(&self) -> Vec<PeerId> {
        self.state.lock().closed.clone()
    }

    fn register_connection(&self, pid: PeerId, remote_address: &str) {
        {
            let mut state = self.state.lock();
            if state.connected.contains(&pid) {
                return;
            }
            state.connected.push(pid.clone());
        }
        let _ = self.events.send(ConnectionEvent::Connected(ConnectionInfo {
            peer: pid,
            remote_address: remote_address.to_string(),
        }));
    }
}

#[async_trait]
impl ConnectableHost for TestHost {
    fn id(&self) -> PeerId {
        self.id.clone()
    }

    async fn connect_to_peer(&self, address: &str) -> Result<PeerId, DiscoveryError> {
        let pid = {
            let mut state = self.state.lock();
            state.attempted.push(address.to_string());
            state.reachable.get(address).cloned()
        };

        let pid = pid.ok_or_else(|| DiscoveryError::Host(format!("unreachable address {address}")))?;
        self.register_connection(pid.clone(), address);
        Ok(pid)
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.state.lock().connected.clone()
    }

    async fn close_peer(&self, pid: &PeerId) -> Result<(), DiscoveryError> {
        self.state.lock().closed.push(pid.clone());
        self.drop_connection(pid);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}

/// DHT handler counting calls
#[derive(Default)]
pub struct TestKadDht {
    bootstraps: AtomicUsize,
    refreshes: AtomicUsize,
    closed: AtomicBool,
    fail_bootstrap: AtomicBool,
}

impl TestKadDht {
    pub fn bootstrap_calls(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn set_fail_bootstrap(&self, fail: bool) {
        self.fail_bootstrap.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KadDhtHandler for TestKadDht {
    async fn bootstrap(&self) -> Result<(), DiscoveryError> {
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        if self.fail_bootstrap.load(Ordering::SeqCst) {
            return Err(DiscoveryError::KadDht("bootstrap failed".into()));
        }
        Ok(())
    }

    async fn refresh_routing_table(&self) -> Result<(), DiscoveryError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), DiscoveryError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder handing out `TestKadDht` handlers
#[derive(Default)]
pub struct TestKadDhtBuilder {
    built: Mutex<Vec<Arc<TestKadDht>>>,
    build_calls: AtomicUsize,
    options: Mutex<Option<KadDhtOptions>>,
    failures_left: AtomicUsize,
    delay: Mutex<Duration>,
}

impl TestKadDhtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` builds
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Make every build take `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Number of build calls, failed ones included
    pub fn builds(&self) -> usize {
        self.build_calls.load(Ordering::SeqCst)
    }

    pub fn last_handler(&self) -> Option<Arc<TestKadDht>> {
        self.built.lock().last().cloned()
    }

    pub fn last_options(&self) -> Option<KadDhtOptions> {
        self.options.lock().clone()
    }
}

#[async_trait]
impl KadDhtBuilder for TestKadDhtBuilder {
    async fn build(
        &self,
        _host: Arc<HostWithConnectionManagement>,
        options: &KadDhtOptions,
    ) -> Result<Arc<dyn KadDhtHandler>, DiscoveryError> {
        self.build_calls.fetch_add(1, Ordering::SeqCst);
        *self.options.lock() = Some(options.clone());

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(DiscoveryError::KadDht("build failed".into()));
        }

        let handler = Arc::new(TestKadDht::default());
        self.built.lock().push(handler.clone());
        Ok(handler)
    }
}
