//! In-memory hotkey backend and OS-call stub for tests.
//!
//! `RecordingApi` captures the exact sequence of raw registration calls so
//! ordering properties (unregister-before-register, no call on invalid input)
//! are checkable. `MockBackend` is a full pump backend driven by simulated
//! raw notification payloads instead of an OS queue; it also serves as the
//! inert fallback on platforms without a real backend.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::backend::{HotkeyBackend, HotkeyError, PumpCommand, PumpWaker};
use super::dispatch::Dispatcher;
use super::event::decode_payload;
use super::registrar::{HotkeyApi, HotkeyBinding, RegistrationError, SlotRegistrar};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One raw OS-level call observed by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Register { slot: i32, binding: HotkeyBinding },
    Unregister { slot: i32 },
}

#[derive(Default)]
struct LogInner {
    calls: Vec<ApiCall>,
    fail_next_register: bool,
}

/// Shared view into the calls a `RecordingApi` has made.
#[derive(Clone, Default)]
pub struct ApiLog(Arc<Mutex<LogInner>>);

impl ApiLog {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.0.lock().unwrap().calls.clone()
    }

    /// Make the next register call fail as an OS-level conflict.
    pub fn fail_next_register(&self) {
        self.0.lock().unwrap().fail_next_register = true;
    }
}

/// `HotkeyApi` stub that records calls instead of touching the OS.
pub struct RecordingApi {
    log: ApiLog,
}

impl RecordingApi {
    pub fn new() -> (Self, ApiLog) {
        let log = ApiLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl HotkeyApi for RecordingApi {
    fn register(&mut self, slot: i32, binding: HotkeyBinding) -> Result<(), RegistrationError> {
        let mut inner = self.log.0.lock().unwrap();
        if std::mem::take(&mut inner.fail_next_register) {
            return Err(RegistrationError::Conflict);
        }
        inner.calls.push(ApiCall::Register { slot, binding });
        Ok(())
    }

    fn unregister(&mut self, slot: i32) -> Result<(), RegistrationError> {
        let mut inner = self.log.0.lock().unwrap();
        inner.calls.push(ApiCall::Unregister { slot });
        Ok(())
    }
}

/// Test hook for driving a `MockBackend` from outside the pump.
#[derive(Clone)]
pub struct MockHandle {
    raw_tx: mpsc::Sender<u32>,
    pub log: ApiLog,
}

impl MockHandle {
    /// Simulate the OS delivering a raw hotkey notification payload.
    pub fn fire(&self, raw: u32) {
        let _ = self.raw_tx.send(raw);
    }
}

/// Command-driven backend with no OS receiver; the pump polls its channels.
pub struct MockBackend {
    raw_rx: mpsc::Receiver<u32>,
    api: Option<RecordingApi>,
}

impl MockBackend {
    pub fn new() -> (Self, MockHandle) {
        let (raw_tx, raw_rx) = mpsc::channel();
        let (api, log) = RecordingApi::new();
        (
            Self {
                raw_rx,
                api: Some(api),
            },
            MockHandle { raw_tx, log },
        )
    }

    /// Inert backend for platforms without hotkey support. Registration
    /// still goes through the slot registrar, but no notification can ever
    /// arrive.
    pub fn inert() -> Self {
        let (backend, _handle) = Self::new();
        backend
    }
}

struct NoopWaker;

impl PumpWaker for NoopWaker {
    // The mock pump polls on a short interval, so a queued command is picked
    // up without an explicit nudge.
    fn wake(&self) {}
}

impl HotkeyBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn run(
        mut self: Box<Self>,
        ready: mpsc::Sender<Result<Box<dyn PumpWaker>, HotkeyError>>,
        commands: mpsc::Receiver<PumpCommand>,
        events: Dispatcher,
    ) {
        let api = match self.api.take() {
            Some(api) => api,
            None => {
                let _ = ready.send(Err(HotkeyError::BackendInit(
                    "mock backend started twice".into(),
                )));
                return;
            }
        };
        let mut registrar = SlotRegistrar::new(api);

        if ready.send(Ok(Box::new(NoopWaker))).is_err() {
            return;
        }

        loop {
            match commands.recv_timeout(POLL_INTERVAL) {
                Ok(PumpCommand::Register {
                    key,
                    modifiers,
                    reply,
                }) => {
                    let _ = reply.send(registrar.register(key, modifiers));
                }
                Ok(PumpCommand::Unregister { reply }) => {
                    let _ = reply.send(registrar.unregister());
                }
                Ok(PumpCommand::Shutdown) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            // The OS only notifies while a combination is registered.
            while let Ok(raw) = self.raw_rx.try_recv() {
                if registrar.current().is_some() {
                    events.deliver(decode_payload(raw));
                }
            }
        }

        registrar.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_api_logs_in_order() {
        let (mut api, log) = RecordingApi::new();
        let binding = HotkeyBinding::new(
            crate::keys::KeyCode::F1,
            crate::keys::ModifierSet::CONTROL,
        )
        .unwrap();

        api.register(1, binding).unwrap();
        api.unregister(1).unwrap();

        assert_eq!(
            log.calls(),
            vec![
                ApiCall::Register { slot: 1, binding },
                ApiCall::Unregister { slot: 1 },
            ]
        );
    }

    #[test]
    fn test_fail_next_register_is_one_shot() {
        let (mut api, log) = RecordingApi::new();
        let binding = HotkeyBinding::new(
            crate::keys::KeyCode::F1,
            crate::keys::ModifierSet::CONTROL,
        )
        .unwrap();

        log.fail_next_register();
        assert_eq!(api.register(1, binding), Err(RegistrationError::Conflict));
        assert!(api.register(1, binding).is_ok());
    }
}
