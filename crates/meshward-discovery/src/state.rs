//! Discoverer lifecycle state
//!
//! ```text
//! NotInitialized ──bootstrap──▶ Initializing ──▶ Initialized
//!        ▲                           │
//!        │                           ▼
//!        └──────── (retry) ───── Error
//!
//! any state ──stop──▶ Stopped
//! ```

use tokio::sync::watch;

use crate::error::DiscoveryError;

#[derive(Debug, Clone, PartialEq)]
pub enum DiscovererState {
    NotInitialized,
    Initializing,
    Initialized,
    Error(DiscoveryError),
    Stopped,
}

impl DiscovererState {
    /// Whether initialization has produced an outcome
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::NotInitialized | Self::Initializing)
    }
}

/// Owner side of the state watch channel
pub(crate) struct StateSignal {
    tx: watch::Sender<DiscovererState>,
}

impl StateSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(DiscovererState::NotInitialized);
        Self { tx }
    }

    pub fn current(&self) -> DiscovererState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscovererState> {
        self.tx.subscribe()
    }

    /// Move to `Initializing`; `Ok(false)` when initialization already started
    pub fn try_begin(&self) -> Result<bool, DiscoveryError> {
        let mut outcome = Ok(false);
        self.tx.send_if_modified(|state| match state {
            DiscovererState::NotInitialized | DiscovererState::Error(_) => {
                *state = DiscovererState::Initializing;
                outcome = Ok(true);
                true
            }
            DiscovererState::Initializing | DiscovererState::Initialized => false,
            DiscovererState::Stopped => {
                outcome = Err(DiscoveryError::Stopped);
                false
            }
        });
        outcome
    }

    /// Publish an initialization outcome unless already stopped
    pub fn set(&self, next: DiscovererState) {
        self.tx.send_if_modified(|state| {
            if *state == DiscovererState::Stopped {
                return false;
            }
            *state = next;
            true
        });
    }

    pub fn stop(&self) {
        self.tx.send_replace(DiscovererState::Stopped);
    }
}

/// Wait until the state leaves `NotInitialized` / `Initializing`
pub async fn wait_for_outcome(mut rx: watch::Receiver<DiscovererState>) -> DiscovererState {
    loop {
        {
            let state = rx.borrow_and_update();
            if state.is_settled() {
                return state.clone();
            }
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}
