//! Hotkey listener lifecycle and pump-thread ownership.
//!
//! The listener owns one platform backend and the dedicated thread its
//! message loop runs on. Registration calls are marshaled onto that thread,
//! because the OS ties both the hidden receiver and the hotkey slot to the
//! thread that created them.
//!
//! Lifecycle: `Created` (receiver not yet built) -> `Armed` (loop running,
//! events flowing) -> `Disposed` (terminal; receiver destroyed, binding
//! released). `Disposed` is reachable from any state and nothing is valid
//! afterwards.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::backend::{HotkeyBackend, HotkeyError, PumpCommand, PumpWaker};
use super::dispatch::Dispatcher;
use super::registrar::{HotkeyBinding, RegistrationError};
use crate::keys::{KeyCode, ModifierSet};

/// How long to wait for the pump thread to build its receiver.
const START_TIMEOUT: Duration = Duration::from_secs(5);
/// How long a marshaled register/unregister may take before giving up.
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Armed,
    Disposed,
}

struct PumpThread {
    commands: mpsc::Sender<PumpCommand>,
    waker: Box<dyn PumpWaker>,
    handle: thread::JoinHandle<()>,
}

/// Owner of the hidden receiver and the single hotkey slot.
pub struct HotkeyListener {
    phase: Phase,
    backend_name: &'static str,
    pending: Option<(Box<dyn HotkeyBackend>, Dispatcher)>,
    pump: Option<PumpThread>,
    binding: Option<HotkeyBinding>,
}

impl HotkeyListener {
    /// Create a listener in the `Created` state. No OS state exists yet.
    pub fn new(backend: Box<dyn HotkeyBackend>, dispatcher: Dispatcher) -> Self {
        Self {
            phase: Phase::Created,
            backend_name: backend.name(),
            pending: Some((backend, dispatcher)),
            pump: None,
            binding: None,
        }
    }

    /// Spawn the pump thread and wait for the backend's receiver to exist.
    ///
    /// A failed start consumes the backend and leaves the listener disposed;
    /// the daemon keeps running without hotkey capture.
    pub fn start(&mut self) -> Result<(), HotkeyError> {
        match self.phase {
            Phase::Armed => return Err(HotkeyError::AlreadyArmed),
            Phase::Disposed => return Err(HotkeyError::Disposed),
            Phase::Created => {}
        }

        let (backend, dispatcher) = self.pending.take().ok_or(HotkeyError::Disposed)?;

        let (ready_tx, ready_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("hotkey-pump".to_string())
            .spawn(move || backend.run(ready_tx, cmd_rx, dispatcher))
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(waker)) => {
                self.pump = Some(PumpThread {
                    commands: cmd_tx,
                    waker,
                    handle,
                });
                self.phase = Phase::Armed;
                info!(backend = self.backend_name, "hotkey listener armed");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.phase = Phase::Disposed;
                Err(e)
            }
            Err(_) => {
                // The thread holds a dead ready channel; if it ever comes up
                // it notices the closed receiver and exits on its own.
                drop(cmd_tx);
                self.phase = Phase::Disposed;
                Err(HotkeyError::StartTimeout)
            }
        }
    }

    /// Register a combination into the slot, replacing any prior one.
    pub fn register(
        &mut self,
        key: KeyCode,
        modifiers: ModifierSet,
    ) -> Result<(), RegistrationError> {
        match self.phase {
            Phase::Created => return Err(RegistrationError::NotArmed),
            Phase::Disposed => return Err(RegistrationError::Disposed),
            Phase::Armed => {}
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_command(PumpCommand::Register {
            key,
            modifiers,
            reply: reply_tx,
        })?;
        let result = Self::await_reply(&reply_rx);
        if result.is_ok() {
            // The pump accepted it, so the binding invariant held.
            self.binding = HotkeyBinding::new(key, modifiers).ok();
        }
        result
    }

    /// Release the slot. A no-op when nothing is registered.
    pub fn unregister(&mut self) -> Result<(), RegistrationError> {
        match self.phase {
            // Nothing was ever registered; honor the idempotent contract.
            Phase::Created => return Ok(()),
            Phase::Disposed => return Err(RegistrationError::Disposed),
            Phase::Armed => {}
        }

        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_command(PumpCommand::Unregister { reply: reply_tx })?;
        let result = Self::await_reply(&reply_rx);
        self.binding = None;
        result
    }

    /// Tear down the receiver and the pump thread. Any registered binding is
    /// released best-effort; terminal and idempotent.
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }

        if let Some(pump) = self.pump.take() {
            let _ = pump.commands.send(PumpCommand::Shutdown);
            pump.waker.wake();
            if pump.handle.join().is_err() {
                warn!("hotkey pump thread panicked during shutdown");
            }
        }

        self.pending = None;
        self.binding = None;
        self.phase = Phase::Disposed;
        info!(backend = self.backend_name, "hotkey listener disposed");
    }

    pub fn is_armed(&self) -> bool {
        self.phase == Phase::Armed
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// The combination currently held in the slot, as last confirmed by the
    /// pump thread.
    pub fn current_binding(&self) -> Option<HotkeyBinding> {
        self.binding
    }

    fn send_command(&self, command: PumpCommand) -> Result<(), RegistrationError> {
        let pump = self
            .pump
            .as_ref()
            .ok_or_else(|| RegistrationError::Backend("pump thread not running".into()))?;
        pump.commands
            .send(command)
            .map_err(|_| RegistrationError::Backend("pump thread terminated".into()))?;
        pump.waker.wake();
        Ok(())
    }

    fn await_reply(
        reply_rx: &mpsc::Receiver<Result<(), RegistrationError>>,
    ) -> Result<(), RegistrationError> {
        reply_rx
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| RegistrationError::Backend("no reply from pump thread".into()))?
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::hotkey::dispatch::Subscription;
    use crate::hotkey::event::encode_payload;
    use crate::hotkey::mock::{ApiCall, MockBackend, MockHandle};
    use crate::hotkey::registrar::HOTKEY_SLOT;

    fn armed_listener() -> (HotkeyListener, MockHandle, Subscription) {
        let (backend, handle) = MockBackend::new();
        let (dispatcher, subscription) = Dispatcher::channel(8);
        let mut listener = HotkeyListener::new(Box::new(backend), dispatcher);
        listener.start().unwrap();
        (listener, handle, subscription)
    }

    fn wait_for_event(subscription: &mut Subscription) -> crate::hotkey::event::HotkeyEvent {
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            if let Some(event) = subscription.try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "no hotkey event delivered");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_register_before_start_is_rejected() {
        let (backend, handle) = MockBackend::new();
        let (dispatcher, _subscription) = Dispatcher::channel(8);
        let mut listener = HotkeyListener::new(Box::new(backend), dispatcher);

        assert_eq!(
            listener.register(KeyCode::F1, ModifierSet::CONTROL),
            Err(RegistrationError::NotArmed)
        );
        assert!(handle.log.calls().is_empty());
    }

    #[test]
    fn test_unregister_in_created_state_is_a_no_op() {
        let (backend, _handle) = MockBackend::new();
        let (dispatcher, _subscription) = Dispatcher::channel(8);
        let mut listener = HotkeyListener::new(Box::new(backend), dispatcher);

        assert_eq!(listener.unregister(), Ok(()));
    }

    #[test]
    fn test_register_marshals_to_pump_thread() {
        let (mut listener, handle, _subscription) = armed_listener();

        listener
            .register(KeyCode::F1, ModifierSet::CONTROL | ModifierSet::SHIFT)
            .unwrap();

        let calls = handle.log.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], ApiCall::Register { slot: HOTKEY_SLOT, .. }));
        assert!(listener.current_binding().is_some());
    }

    #[test]
    fn test_invalid_combination_never_reaches_the_pump_api() {
        let (mut listener, handle, _subscription) = armed_listener();

        assert_eq!(
            listener.register(KeyCode::F1, ModifierSet::NONE),
            Err(RegistrationError::InvalidCombination)
        );
        assert!(handle.log.calls().is_empty());
        assert_eq!(listener.current_binding(), None);
    }

    #[test]
    fn test_dispose_is_terminal() {
        let (mut listener, _handle, _subscription) = armed_listener();

        listener.dispose();
        listener.dispose();

        assert!(!listener.is_armed());
        assert_eq!(
            listener.register(KeyCode::F1, ModifierSet::CONTROL),
            Err(RegistrationError::Disposed)
        );
        assert_eq!(listener.unregister(), Err(RegistrationError::Disposed));
        assert!(matches!(listener.start(), Err(HotkeyError::Disposed)));
    }

    #[test]
    fn test_dispose_releases_registered_binding() {
        let (mut listener, handle, _subscription) = armed_listener();

        listener.register(KeyCode::F1, ModifierSet::CONTROL).unwrap();
        listener.dispose();

        let calls = handle.log.calls();
        assert_eq!(calls.last(), Some(&ApiCall::Unregister { slot: HOTKEY_SLOT }));
    }

    #[test]
    fn test_fired_notification_reaches_subscriber() {
        let (mut listener, handle, mut subscription) = armed_listener();

        listener
            .register(KeyCode::F1, ModifierSet::CONTROL | ModifierSet::SHIFT)
            .unwrap();
        handle.fire(encode_payload(
            ModifierSet::CONTROL | ModifierSet::SHIFT,
            KeyCode::F1,
        ));

        let event = wait_for_event(&mut subscription);
        assert_eq!(event.modifiers, ModifierSet::CONTROL | ModifierSet::SHIFT);
        assert_eq!(event.key, KeyCode::F1);

        // Exactly one activation per notification.
        thread::sleep(Duration::from_millis(20));
        assert!(subscription.try_recv().is_none());

        listener.dispose();
    }

    #[test]
    fn test_notification_without_binding_is_not_delivered() {
        let (listener, handle, mut subscription) = armed_listener();

        handle.fire(0x0070_0006);

        thread::sleep(Duration::from_millis(30));
        assert!(subscription.try_recv().is_none());
        drop(listener);
    }
}
