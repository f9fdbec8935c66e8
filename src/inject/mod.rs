//! Keystroke injection into foreign windows.
//!
//! Stateless fire-and-forget posting of key-down/key-up messages at a target
//! window handle. Completely independent of hotkey capture; the only shared
//! vocabulary is [`KeyCode`]. Callers pair down and up calls themselves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::keys::KeyCode;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(windows)]
mod windows;

/// Message id for a synthesized key press.
pub const KEY_DOWN_MSG: u32 = 0x0100;
/// Message id for a synthesized key release.
pub const KEY_UP_MSG: u32 = 0x0101;

/// Transition flag bits carried in the payload's low word.
pub const KEY_DOWN_TRANSITION: u32 = 0x0001;
pub const KEY_UP_TRANSITION: u32 = 0x0002;

/// Opaque reference to another process's window, supplied by the caller.
///
/// Never validated for liveness: posting to a handle whose window has closed
/// silently does nothing at the OS layer. Keeping enumerated handles fresh is
/// the caller's responsibility.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetWindowHandle(isize);

impl TargetWindowHandle {
    pub const fn from_raw(raw: isize) -> Self {
        TargetWindowHandle(raw)
    }

    pub const fn as_raw(self) -> isize {
        self.0
    }
}

impl fmt::Debug for TargetWindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetWindowHandle(0x{:X})", self.0)
    }
}

impl fmt::Display for TargetWindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Errors surfaced by injection. Posting is fire-and-forget at the OS
/// layer, but a refused post is still reported so the caller can decide
/// what it means.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InjectionError {
    #[error("failed to post key message to target: {0}")]
    PostFailed(String),

    #[error("key {0} cannot be injected on this platform")]
    UnmappedKey(KeyCode),
}

/// Pack the key-message payload: scan code in the high word, transition
/// flags in the low word.
pub fn key_payload(scan_code: u32, transition: u32) -> isize {
    ((scan_code << 16) | transition) as isize
}

/// Raw posting capability, implemented per platform and stubbed in tests.
/// Mirrors the OS contract: `post(handle, message, key, payload)`.
pub trait KeyPost {
    /// Hardware scan code for a key, as packed into the payload.
    fn scan_code(&self, key: KeyCode) -> Result<u32, InjectionError>;

    /// Post one key message; asynchronous, no confirmation the target
    /// processed it.
    fn post(
        &self,
        target: TargetWindowHandle,
        message: u32,
        key: KeyCode,
        payload: isize,
    ) -> Result<(), InjectionError>;
}

/// Synthesizes key-down/key-up events aimed at a target window.
pub struct KeyInjector<P> {
    poster: P,
}

impl<P: KeyPost> KeyInjector<P> {
    pub fn new(poster: P) -> Self {
        Self { poster }
    }

    /// Post a key-down at the target. Returns as soon as the message is
    /// queued.
    pub fn send_key_down(
        &self,
        target: TargetWindowHandle,
        key: KeyCode,
    ) -> Result<(), InjectionError> {
        self.send(target, key, KEY_DOWN_MSG, KEY_DOWN_TRANSITION)
    }

    /// Post a key-up at the target.
    pub fn send_key_up(
        &self,
        target: TargetWindowHandle,
        key: KeyCode,
    ) -> Result<(), InjectionError> {
        self.send(target, key, KEY_UP_MSG, KEY_UP_TRANSITION)
    }

    fn send(
        &self,
        target: TargetWindowHandle,
        key: KeyCode,
        message: u32,
        transition: u32,
    ) -> Result<(), InjectionError> {
        let scan_code = self.poster.scan_code(key)?;
        self.poster
            .post(target, message, key, key_payload(scan_code, transition))
    }
}

/// Poster for platforms without an injection API.
pub struct NullPoster;

impl KeyPost for NullPoster {
    fn scan_code(&self, _key: KeyCode) -> Result<u32, InjectionError> {
        Ok(0)
    }

    fn post(
        &self,
        _target: TargetWindowHandle,
        _message: u32,
        _key: KeyCode,
        _payload: isize,
    ) -> Result<(), InjectionError> {
        Err(InjectionError::PostFailed(
            "key injection is not supported on this platform".into(),
        ))
    }
}

#[cfg(windows)]
pub type PlatformPoster = windows::Win32Poster;

#[cfg(target_os = "macos")]
pub type PlatformPoster = macos::MacPoster;

#[cfg(not(any(windows, target_os = "macos")))]
pub type PlatformPoster = NullPoster;

/// Injector backed by the build target's posting API.
pub fn platform_injector() -> KeyInjector<PlatformPoster> {
    #[cfg(windows)]
    {
        KeyInjector::new(windows::Win32Poster::new())
    }

    #[cfg(target_os = "macos")]
    {
        KeyInjector::new(macos::MacPoster::new())
    }

    #[cfg(not(any(windows, target_os = "macos")))]
    {
        KeyInjector::new(NullPoster)
    }
}
