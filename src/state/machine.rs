//! Hold-toggle controller.
//!
//! Consumes hotkey activations and pairs key-down/key-up injections at the
//! current target: one activation starts holding the configured key, the
//! next releases it. Changing the target or held key mid-hold releases
//! first, so a key is never left stuck in a window that can no longer be
//! addressed.

use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::events::DaemonEvent;
use crate::hotkey::{HotkeyEvent, Subscription};
use crate::inject::{InjectionError, KeyInjector, KeyPost, TargetWindowHandle};
use crate::keys::KeyCode;

/// Control-plane updates from the IPC surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetTarget { target: Option<TargetWindowHandle> },
    SetHeldKey { key: KeyCode },
    /// The hotkey binding was cleared; an active hold must end.
    BindingCleared,
}

#[derive(Debug, Clone, Copy)]
struct ActiveHold {
    key: KeyCode,
    target: TargetWindowHandle,
    since: Instant,
}

/// Toggles between idle and holding on each hotkey activation.
pub struct HoldController<P> {
    injector: KeyInjector<P>,
    target: Option<TargetWindowHandle>,
    held_key: KeyCode,
    hold: Option<ActiveHold>,
    event_tx: broadcast::Sender<DaemonEvent>,
}

impl<P: KeyPost> HoldController<P> {
    pub fn new(injector: KeyInjector<P>, event_tx: broadcast::Sender<DaemonEvent>) -> Self {
        Self {
            injector,
            target: None,
            held_key: KeyCode::NONE,
            hold: None,
            event_tx,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    /// Run the controller until both input channels close.
    pub async fn run(
        &mut self,
        mut activations: Subscription,
        mut commands: mpsc::Receiver<ControlCommand>,
    ) {
        info!("hold controller started");

        loop {
            tokio::select! {
                event = activations.recv() => match event {
                    Some(event) => self.handle_activation(event),
                    None => break,
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }

        // End of input; don't leave a key pressed in the target.
        self.release();
        info!("hold controller stopped");
    }

    /// One hotkey activation toggles the hold.
    fn handle_activation(&mut self, event: HotkeyEvent) {
        debug!(?event, holding = self.is_holding(), "hotkey activation");
        if self.hold.is_some() {
            self.release();
        } else {
            self.begin_hold();
        }
    }

    fn handle_command(&mut self, command: ControlCommand) {
        match command {
            ControlCommand::SetTarget { target } => {
                self.release();
                self.target = target;
                self.emit(DaemonEvent::TargetChanged { target });
            }
            ControlCommand::SetHeldKey { key } => {
                self.release();
                self.held_key = key;
                debug!(key = %key, "held key configured");
            }
            ControlCommand::BindingCleared => self.release(),
        }
    }

    fn begin_hold(&mut self) {
        let Some(target) = self.target else {
            warn!("hotkey fired but no target window is selected");
            return;
        };
        if self.held_key.is_none() {
            warn!("hotkey fired but no key is configured to hold");
            return;
        }

        match self.injector.send_key_down(target, self.held_key) {
            Ok(()) => {
                self.hold = Some(ActiveHold {
                    key: self.held_key,
                    target,
                    since: Instant::now(),
                });
                info!(key = %self.held_key, %target, "hold started");
                self.emit(DaemonEvent::HoldStarted {
                    key: self.held_key,
                    target,
                });
            }
            Err(e) => {
                warn!(key = %self.held_key, %target, error = %e, "key-down failed");
                self.emit_injection_failure("key_down", &e);
            }
        }
    }

    /// End an active hold. A no-op when idle.
    fn release(&mut self) {
        let Some(hold) = self.hold.take() else {
            return;
        };
        let duration_ms = hold.since.elapsed().as_millis() as u64;

        match self.injector.send_key_up(hold.target, hold.key) {
            Ok(()) => {
                info!(key = %hold.key, target = %hold.target, duration_ms, "hold released");
                self.emit(DaemonEvent::HoldReleased {
                    key: hold.key,
                    target: hold.target,
                    duration_ms,
                });
            }
            Err(e) => {
                // The hold state is gone either way; the target may have a
                // stuck key if it is still alive.
                warn!(key = %hold.key, target = %hold.target, error = %e, "key-up failed");
                self.emit_injection_failure("key_up", &e);
            }
        }
    }

    fn emit(&self, event: DaemonEvent) {
        debug!(%event, "emitting daemon event");
        let _ = self.event_tx.send(event);
    }

    fn emit_injection_failure(&self, operation: &str, error: &InjectionError) {
        self.emit(DaemonEvent::InjectionFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        });
    }
}
