//! Single-subscriber delivery of decoded hotkey events.
//!
//! A bounded channel replaces the observer-style multi-handler hookup: there
//! is exactly one active subscriber, and delivery from the pump thread blocks
//! when the subscriber lags, which queues further OS notifications behind the
//! pump (the intended backpressure).

use tokio::sync::mpsc;
use tracing::{trace, warn};

use super::event::HotkeyEvent;

/// Sending half, owned by the pump thread's backend.
pub struct Dispatcher {
    tx: mpsc::Sender<HotkeyEvent>,
}

/// The single active subscriber.
pub struct Subscription {
    rx: mpsc::Receiver<HotkeyEvent>,
}

impl Dispatcher {
    /// Create a dispatcher and its one subscription.
    pub fn channel(capacity: usize) -> (Dispatcher, Subscription) {
        let (tx, rx) = mpsc::channel(capacity);
        (Dispatcher { tx }, Subscription { rx })
    }

    /// Deliver one event. Called from the pump thread, never from async
    /// context. A dropped subscription downgrades delivery to a warning.
    pub fn deliver(&self, event: HotkeyEvent) {
        trace!(?event, "delivering hotkey event");
        if self.tx.blocking_send(event).is_err() {
            warn!(?event, "hotkey event dropped - subscriber went away");
        }
    }
}

impl Subscription {
    /// Receive the next activation. `None` once the pump has shut down.
    pub async fn recv(&mut self) -> Option<HotkeyEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive for synchronous callers.
    pub fn try_recv(&mut self) -> Option<HotkeyEvent> {
        self.rx.try_recv().ok()
    }
}
