//! Platform capability interface for the hotkey message pump.
//!
//! A backend owns the OS-side receiver and its blocking event loop. The loop
//! runs on the thread `run` is called on (the pump thread the listener
//! spawns), because registration and the receiver are tied to that thread by
//! the OS. Everything that crosses thread boundaries goes through the command
//! channel and the waker.

use std::sync::mpsc;

use super::dispatch::Dispatcher;
use super::registrar::RegistrationError;
use crate::keys::{KeyCode, ModifierSet};

/// Requests marshaled onto the pump thread.
pub enum PumpCommand {
    Register {
        key: KeyCode,
        modifiers: ModifierSet,
        reply: mpsc::Sender<Result<(), RegistrationError>>,
    },
    Unregister {
        reply: mpsc::Sender<Result<(), RegistrationError>>,
    },
    Shutdown,
}

/// Nudges the pump loop after a command has been queued. Sent back by the
/// backend once its receiver exists, since the wake mechanism usually needs a
/// handle only the pump thread can create.
pub trait PumpWaker: Send {
    fn wake(&self);
}

/// A platform hotkey engine.
pub trait HotkeyBackend: Send + 'static {
    fn name(&self) -> &'static str;

    /// Create the receiver on the current thread, report readiness (with a
    /// waker) or an initialization error through `ready`, then pump until a
    /// `Shutdown` command arrives. Decoded activations go out through
    /// `events`.
    fn run(
        self: Box<Self>,
        ready: mpsc::Sender<Result<Box<dyn PumpWaker>, HotkeyError>>,
        commands: mpsc::Receiver<PumpCommand>,
        events: Dispatcher,
    );
}

/// Listener lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already armed")]
    AlreadyArmed,

    #[error("hotkey listener has been disposed")]
    Disposed,

    #[error("failed to spawn pump thread: {0}")]
    ThreadSpawn(String),

    #[error("hotkey backend failed to initialize: {0}")]
    BackendInit(String),

    #[error("pump thread did not report readiness in time")]
    StartTimeout,
}
