//! Connections watchers
//!
//! Observers told about every new connection. The print watcher logs each
//! peer once per time to live; the disabled watcher drops everything.

use meshward_core::ConnectionWatcherType;
use meshward_types::PeerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, Instrument, Span};

use crate::error::DiscoveryError;

/// Shortest time to live accepted by the print watcher
pub const MIN_TIME_TO_LIVE: Duration = Duration::from_secs(1);

pub trait ConnectionsWatcher: Send + Sync {
    /// Called for every established connection with its remote address
    fn new_known_connection(&self, pid: &PeerId, connection: &str);

    /// Stop background work; further connections are still accepted
    fn close(&self) -> Result<(), DiscoveryError>;
}

/// Watcher that ignores all connections
#[derive(Debug, Default)]
pub struct DisabledConnectionsWatcher;

impl DisabledConnectionsWatcher {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionsWatcher for DisabledConnectionsWatcher {
    fn new_known_connection(&self, _pid: &PeerId, _connection: &str) {}

    fn close(&self) -> Result<(), DiscoveryError> {
        Ok(())
    }
}

/// Reaction to a connection that was not seen within the time to live
pub type PrintHandler = Box<dyn Fn(&PeerId, &str, &Span) + Send + Sync>;

/// Default handler, logs the connection at info level
pub fn log_print_handler(pid: &PeerId, connection: &str, span: &Span) {
    info!(parent: span, pid = %pid, connection = %connection, "Known connection");
}

/// Logs every peer at most once per time to live
pub struct PrintConnectionsWatcher {
    seen: Arc<Mutex<HashMap<PeerId, Instant>>>,
    time_to_live: Duration,
    handler: PrintHandler,
    cancel: CancellationToken,
    sweeper_closed: Arc<AtomicBool>,
    span: Span,
}

impl PrintConnectionsWatcher {
    pub fn new(time_to_live: Duration, span: Span) -> Result<Self, DiscoveryError> {
        Self::with_handler(time_to_live, span, Box::new(log_print_handler))
    }

    /// Create a watcher reporting through `handler` instead of the log
    pub fn with_handler(
        time_to_live: Duration,
        span: Span,
        handler: PrintHandler,
    ) -> Result<Self, DiscoveryError> {
        if time_to_live < MIN_TIME_TO_LIVE {
            return Err(DiscoveryError::InvalidValue(format!(
                "connections watcher time to live {time_to_live:?}, minimum {MIN_TIME_TO_LIVE:?}"
            )));
        }
        let runtime = Handle::try_current().map_err(|_| DiscoveryError::NoRuntime)?;

        let watcher = Self {
            seen: Arc::new(Mutex::new(HashMap::new())),
            time_to_live,
            handler,
            cancel: CancellationToken::new(),
            sweeper_closed: Arc::new(AtomicBool::new(false)),
            span,
        };

        let seen = watcher.seen.clone();
        let cancel = watcher.cancel.clone();
        let closed = watcher.sweeper_closed.clone();
        runtime.spawn(
            async move {
                let mut ticker = tokio::time::interval(time_to_live);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            let mut seen = seen.lock();
                            seen.retain(|_, reported_at| reported_at.elapsed() < time_to_live);
                            trace!(remaining = seen.len(), "Swept known connections");
                        }
                    }
                }
                closed.store(true, Ordering::Release);
            }
            .instrument(watcher.span.clone()),
        );

        Ok(watcher)
    }

    /// Whether the background sweeper has exited
    pub fn is_sweeper_closed(&self) -> bool {
        self.sweeper_closed.load(Ordering::Acquire)
    }
}

impl ConnectionsWatcher for PrintConnectionsWatcher {
    fn new_known_connection(&self, pid: &PeerId, connection: &str) {
        let connection = connection.trim();
        if connection.is_empty() {
            return;
        }

        {
            let mut seen = self.seen.lock();
            if let Some(reported_at) = seen.get(pid) {
                if reported_at.elapsed() < self.time_to_live {
                    return;
                }
            }
            seen.insert(pid.clone(), Instant::now());
        }

        (self.handler)(pid, connection, &self.span);
    }

    fn close(&self) -> Result<(), DiscoveryError> {
        self.cancel.cancel();
        Ok(())
    }
}

impl Drop for PrintConnectionsWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Create the watcher selected by configuration
pub fn new_connections_watcher(
    watcher_type: ConnectionWatcherType,
    time_to_live: Duration,
    span: Span,
) -> Result<Arc<dyn ConnectionsWatcher>, DiscoveryError> {
    match watcher_type {
        ConnectionWatcherType::Print => {
            Ok(Arc::new(PrintConnectionsWatcher::new(time_to_live, span)?))
        }
        ConnectionWatcherType::Disabled => Ok(Arc::new(DisabledConnectionsWatcher::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_watcher(time_to_live: Duration) -> (PrintConnectionsWatcher, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let watcher = PrintConnectionsWatcher::with_handler(
            time_to_live,
            Span::none(),
            Box::new(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();
        (watcher, calls)
    }

    #[tokio::test]
    async fn test_time_to_live_below_minimum() {
        let result = PrintConnectionsWatcher::new(
            MIN_TIME_TO_LIVE - Duration::from_nanos(1),
            Span::none(),
        );
        assert!(matches!(result, Err(DiscoveryError::InvalidValue(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = PrintConnectionsWatcher::new(MIN_TIME_TO_LIVE, Span::none());
        assert!(matches!(result, Err(DiscoveryError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_blank_connection_is_ignored() {
        let (watcher, calls) = counting_watcher(Duration::from_secs(3600));

        watcher.new_known_connection(&PeerId::from("pid"), " ");
        watcher.new_known_connection(&PeerId::from("pid"), "");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(watcher.close().is_ok());
    }

    #[tokio::test]
    async fn test_reports_once_per_time_to_live() {
        let (watcher, calls) = counting_watcher(MIN_TIME_TO_LIVE);
        let pid = PeerId::from("pid");

        watcher.new_known_connection(&pid, "connection");
        watcher.new_known_connection(&pid, "connection");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        watcher.new_known_connection(&PeerId::from("other"), "connection");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(MIN_TIME_TO_LIVE + Duration::from_millis(100)).await;
        watcher.new_known_connection(&pid, "connection");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        watcher.close().unwrap();
    }

    #[tokio::test]
    async fn test_close_stops_sweeper() {
        let (watcher, _) = counting_watcher(Duration::from_secs(3600));
        assert!(!watcher.is_sweeper_closed());

        assert!(watcher.close().is_ok());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(watcher.is_sweeper_closed());
        assert!(watcher.close().is_ok());
    }

    #[tokio::test]
    async fn test_factory() {
        let watcher =
            new_connections_watcher(ConnectionWatcherType::Disabled, Duration::ZERO, Span::none())
                .unwrap();
        assert!(watcher.close().is_ok());

        let watcher =
            new_connections_watcher(ConnectionWatcherType::Print, MIN_TIME_TO_LIVE, Span::none())
                .unwrap();
        watcher.new_known_connection(&PeerId::from("pid"), "connection");
        watcher.close().unwrap();

        let result =
            new_connections_watcher(ConnectionWatcherType::Print, Duration::ZERO, Span::none());
        assert!(matches!(result, Err(DiscoveryError::InvalidValue(_))));
    }
}
