//! Background activities shared by the Kad-DHT discoverers
//!
//! Every sleep races the cancellation token, so stopping a discoverer ends
//! all of them promptly.

use meshward_types::PeerId;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection_management::HostWithConnectionManagement;
use crate::error::DiscoveryError;

/// Sleep for `duration`; false if cancelled first
pub(crate) async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Dial the initial peers in order until one answers
///
/// The addresses are registered as seeders first. Returns false only when
/// cancelled; an empty list succeeds at once.
pub(crate) async fn connect_to_one_initial_peer(
    host: &HostWithConnectionManagement,
    peers: &[String],
    retry_interval: Duration,
    cancel: &CancellationToken,
) -> bool {
    host.sharder().set_seeders(peers.to_vec());
    if peers.is_empty() {
        return true;
    }

    loop {
        for address in peers {
            if cancel.is_cancelled() {
                return false;
            }

            match host.connect_to_peer(address).await {
                Ok(pid) => {
                    info!(pid = %pid, address = %address, "Connected to initial peer");
                    return true;
                }
                Err(err) => {
                    debug!(address = %address, error = %err, "Initial peer unreachable");
                }
            }

            if !sleep_or_cancel(cancel, retry_interval).await {
                return false;
            }
        }
    }
}

/// Run `step` every `interval` until cancelled, logging failures
pub(crate) async fn run_periodic<F, Fut>(
    activity: &'static str,
    interval: Duration,
    cancel: &CancellationToken,
    mut step: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DiscoveryError>>,
{
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = step() => result,
        };
        if let Err(err) = result {
            warn!(activity, error = %err, "Periodic discovery step failed");
        }

        if !sleep_or_cancel(cancel, interval).await {
            break;
        }
    }
    debug!(activity, "Periodic discovery activity stopped");
}

/// Keep the seeders connected
///
/// Every round dials all disconnected seeders back to back and then sleeps
/// `interval`. `initial_connection` flips after the first round that leaves
/// a seeder connected.
pub(crate) async fn maintain_seeders(
    host: &HostWithConnectionManagement,
    seeders: &[String],
    interval: Duration,
    cancel: &CancellationToken,
    initial_connection: &watch::Sender<bool>,
) {
    host.sharder().set_seeders(seeders.to_vec());
    if seeders.is_empty() {
        initial_connection.send_replace(true);
        return;
    }

    loop {
        if dial_seeders(host, seeders, cancel).await {
            initial_connection.send_replace(true);
        }
        if !sleep_or_cancel(cancel, interval).await {
            return;
        }
    }
}

/// One pass over the seeders; true if any of them is connected afterwards
async fn dial_seeders(
    host: &HostWithConnectionManagement,
    seeders: &[String],
    cancel: &CancellationToken,
) -> bool {
    let mut any_connected = false;
    for address in seeders {
        if cancel.is_cancelled() {
            return false;
        }

        let connected = PeerId::from_address(address).is_some_and(|pid| host.is_connected(&pid));
        if connected {
            any_connected = true;
            continue;
        }

        match host.connect_to_peer(address).await {
            Ok(pid) => {
                info!(pid = %pid, address = %address, "Connected to seeder");
                any_connected = true;
            }
            Err(err) => debug!(address = %address, error = %err, "Seeder unreachable"),
        }
    }
    any_connected
}
