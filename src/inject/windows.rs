//! Win32 key posting.
//!
//! `PostMessageW` with the documented key-message layout: virtual key in
//! `wParam`, `(scan << 16) | transition` in `lParam`. Posting is queued by
//! the OS and serialized with the target window's own message traffic.

use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{MapVirtualKeyW, MAPVK_VK_TO_VSC};
use windows::Win32::UI::WindowsAndMessaging::PostMessageW;

use super::{InjectionError, KeyPost, TargetWindowHandle};
use crate::keys::KeyCode;

pub struct Win32Poster;

impl Win32Poster {
    pub fn new() -> Self {
        Self
    }
}

impl KeyPost for Win32Poster {
    fn scan_code(&self, key: KeyCode) -> Result<u32, InjectionError> {
        // Keys the keyboard driver cannot translate map to scan code 0,
        // which still posts; most targets key off the virtual key anyway.
        Ok(unsafe { MapVirtualKeyW(key.raw() as u32, MAPVK_VK_TO_VSC) })
    }

    fn post(
        &self,
        target: TargetWindowHandle,
        message: u32,
        key: KeyCode,
        payload: isize,
    ) -> Result<(), InjectionError> {
        let hwnd = HWND(target.as_raw() as *mut _);
        unsafe {
            PostMessageW(
                Some(hwnd),
                message,
                WPARAM(key.raw() as usize),
                LPARAM(payload),
            )
        }
        .map_err(|e| InjectionError::PostFailed(e.message()))
    }
}
