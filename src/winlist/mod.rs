//! Visible top-level window enumeration for the target picker.
//!
//! Produces `{handle, title}` pairs. Handles go stale the moment the window
//! closes; the injector deliberately does not re-validate them, so pickers
//! should refresh before use.

use serde::{Deserialize, Serialize};

use crate::inject::TargetWindowHandle;

/// One enumerated window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: TargetWindowHandle,
    pub title: String,
}

/// Enumerate visible, titled top-level windows.
#[cfg(windows)]
pub fn enumerate_windows() -> anyhow::Result<Vec<WindowInfo>> {
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
    use windows::Win32::UI::WindowsAndMessaging::{EnumWindows, GetWindowTextW, IsWindowVisible};

    unsafe extern "system" fn collect(hwnd: HWND, lparam: LPARAM) -> BOOL {
        let list = unsafe { &mut *(lparam.0 as *mut Vec<WindowInfo>) };
        unsafe {
            if IsWindowVisible(hwnd).as_bool() {
                let mut title = [0u16; 512];
                let len = GetWindowTextW(hwnd, &mut title);
                if len > 0 {
                    list.push(WindowInfo {
                        handle: TargetWindowHandle::from_raw(hwnd.0 as isize),
                        title: String::from_utf16_lossy(&title[..len as usize]),
                    });
                }
            }
        }
        TRUE
    }

    let mut list: Vec<WindowInfo> = Vec::new();
    unsafe {
        EnumWindows(
            Some(collect),
            LPARAM(&mut list as *mut Vec<WindowInfo> as isize),
        )?;
    }
    Ok(list)
}

/// Enumeration is Windows-only; elsewhere the picker list is empty and
/// clients supply raw handles themselves.
#[cfg(not(windows))]
pub fn enumerate_windows() -> anyhow::Result<Vec<WindowInfo>> {
    tracing::warn!("window enumeration is unavailable on this platform");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_info_serde_round_trip() {
        let info = WindowInfo {
            handle: TargetWindowHandle::from_raw(0x1234),
            title: "Untitled - Notepad".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        let back: WindowInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }

    #[cfg(not(windows))]
    #[test]
    fn test_enumeration_is_empty_off_windows() {
        assert!(enumerate_windows().unwrap().is_empty());
    }
}
