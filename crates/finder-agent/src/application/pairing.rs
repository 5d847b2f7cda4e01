//! PairingCoordinator: the glue between the confirmation listener and the
//! discovery engine.
//!
//! ```text
//! ConfirmationListener ──Confirmation──► PairingCoordinator ──stop()──► DiscoveryEngine
//!                                                │
//!                                                └──► DeviceFound / ConnectionSuccess
//! ```
//!
//! The listener may raise a confirmation from both its UDP and TCP paths, and
//! several peers may race.  The coordinator acts on the first one only: it stops
//! discovery exactly once and notifies the UI layer exactly once.  Everything
//! after that is logged and ignored.

use std::sync::{Arc, Mutex, PoisonError};

use finder_core::Confirmation;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Control surface of the discovery engine used by the coordinator.
///
/// `stop` must be idempotent and callable from any thread.
pub trait DiscoveryControl: Send + Sync {
    fn stop(&self);
}

/// One-shot notifications raised to the UI / process layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingNotification {
    /// A peer was confirmed; `address` is its IP as text.
    DeviceFound { address: String },
    /// Raised right after `DeviceFound`.
    ConnectionSuccess,
}

/// Stops discovery on the first confirmation and ignores the rest.
pub struct PairingCoordinator {
    discovery: Arc<dyn DiscoveryControl>,
    notifications: mpsc::Sender<PairingNotification>,
    confirmed: Mutex<Option<Confirmation>>,
}

impl PairingCoordinator {
    pub fn new(
        discovery: Arc<dyn DiscoveryControl>,
        notifications: mpsc::Sender<PairingNotification>,
    ) -> Self {
        Self {
            discovery,
            notifications,
            confirmed: Mutex::new(None),
        }
    }

    /// Handles one confirmation.
    ///
    /// Returns `true` if this was the first confirmation of the session, in
    /// which case discovery has been stopped and both notifications queued.
    pub fn handle_confirmation(&self, confirmation: Confirmation) -> bool {
        {
            let mut confirmed = self
                .confirmed
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(first) = *confirmed {
                debug!(
                    "ignoring {} confirmation from {}; already paired with {}",
                    confirmation.transport, confirmation.peer, first.peer
                );
                return false;
            }
            *confirmed = Some(confirmation);
        }

        info!(
            "device confirmed at {} via {}; stopping discovery",
            confirmation.peer, confirmation.transport
        );
        self.discovery.stop();

        self.notify(PairingNotification::DeviceFound {
            address: confirmation.address(),
        });
        self.notify(PairingNotification::ConnectionSuccess);
        true
    }

    /// Drains confirmations until the listener side of the channel is dropped.
    pub async fn run(&self, mut confirmations: mpsc::Receiver<Confirmation>) {
        while let Some(confirmation) = confirmations.recv().await {
            self.handle_confirmation(confirmation);
        }
        debug!("confirmation channel closed; coordinator exiting");
    }

    /// The peer that won the confirmation race, if any.
    pub fn confirmed_peer(&self) -> Option<Confirmation> {
        *self
            .confirmed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notification: PairingNotification) {
        if let Err(e) = self.notifications.try_send(notification) {
            warn!("could not deliver pairing notification: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
