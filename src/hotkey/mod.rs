//! Global hotkey capture subsystem.
//!
//! One registered combination, one hidden OS receiver on a dedicated pump
//! thread, one subscriber. Platform specifics live behind [`HotkeyBackend`]:
//! - Windows: `RegisterHotKey` + message-only window pump
//! - macOS: CGEventTap filter (requires Accessibility permission)
//! - everywhere else: an inert backend, so the daemon still runs

mod backend;
mod dispatch;
mod event;
mod listener;
pub mod mock;
mod registrar;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(windows)]
mod windows;

pub use backend::{HotkeyBackend, HotkeyError, PumpCommand, PumpWaker};
pub use dispatch::{Dispatcher, Subscription};
pub use event::{decode_payload, encode_payload, HotkeyEvent, HOTKEY_NOTIFY};
pub use listener::HotkeyListener;
pub use registrar::{HotkeyApi, HotkeyBinding, RegistrationError, SlotRegistrar, HOTKEY_SLOT};

/// Backend for the build target, selected at startup.
pub fn platform_backend() -> Box<dyn HotkeyBackend> {
    #[cfg(windows)]
    {
        Box::new(windows::Win32Backend::new())
    }

    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacBackend::new())
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    {
        tracing::warn!("global hotkeys are not supported on this platform; using inert backend");
        Box::new(mock::MockBackend::inert())
    }
}
