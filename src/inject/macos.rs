//! macOS key posting via CGEvent.
//!
//! Targets are pids rather than window handles; the synthesized keyboard
//! event is delivered to the process's event queue with `post_to_pid`.

use core_graphics::event::{CGEvent, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

use super::{InjectionError, KeyPost, TargetWindowHandle, KEY_DOWN_MSG};
use crate::keys::macos::mac_keycode;
use crate::keys::KeyCode;

pub struct MacPoster;

impl MacPoster {
    pub fn new() -> Self {
        Self
    }
}

impl KeyPost for MacPoster {
    fn scan_code(&self, key: KeyCode) -> Result<u32, InjectionError> {
        mac_keycode(key)
            .map(u32::from)
            .ok_or(InjectionError::UnmappedKey(key))
    }

    fn post(
        &self,
        target: TargetWindowHandle,
        message: u32,
        key: KeyCode,
        _payload: isize,
    ) -> Result<(), InjectionError> {
        let keycode = mac_keycode(key).ok_or(InjectionError::UnmappedKey(key))? as CGKeyCode;

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| InjectionError::PostFailed("failed to create event source".into()))?;
        let event = CGEvent::new_keyboard_event(source, keycode, message == KEY_DOWN_MSG)
            .map_err(|_| InjectionError::PostFailed("failed to create keyboard event".into()))?;

        event.post_to_pid(target.as_raw() as i32);
        Ok(())
    }
}
