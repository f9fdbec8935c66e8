//! IPC message protocol definitions.
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian
//! length. The daemon answers every request with exactly one response;
//! subscribed clients additionally receive notification frames as daemon
//! events occur.

use serde::{Deserialize, Serialize};

use crate::events::DaemonEvent;
use crate::inject::TargetWindowHandle;
use crate::keys::{KeyCode, ModifierSet};
use crate::winlist::WindowInfo;

/// Requests from the UI to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity.
    Ping,

    /// Request the full daemon status snapshot.
    GetStatus,

    /// Register a hotkey combination, replacing any current one.
    BindHotkey {
        modifiers: ModifierSet,
        key: KeyCode,
    },

    /// Release the hotkey slot.
    ClearHotkey,

    /// Choose the window keystrokes are injected into.
    SetTarget { target: Option<TargetWindowHandle> },

    /// Choose the key the hold toggle presses and releases.
    SetHeldKey { key: KeyCode },

    /// Enumerate candidate target windows.
    ListWindows,

    /// Enumerate the known key universe for pickers.
    ListKeys,

    /// Subscribe to daemon event notifications on this connection.
    Subscribe,
}

/// Responses from the daemon to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping.
    Pong,

    /// Current daemon status.
    Status(DaemonStatus),

    /// The request was applied.
    Ack,

    /// Candidate target windows.
    Windows { windows: Vec<WindowInfo> },

    /// The key universe.
    Keys { keys: Vec<KeyEntry> },

    /// Subscription confirmed.
    Subscribed,

    /// The request failed.
    Error { code: String, message: String },
}

/// Push notification to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Event { event: DaemonEvent },
}

/// One entry of the key picker list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub code: KeyCode,
    pub name: String,
}

/// The currently bound hotkey combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundHotkey {
    pub modifiers: ModifierSet,
    pub key: KeyCode,
}

/// Full daemon status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version.
    pub version: String,

    /// Name of the active hotkey backend.
    pub backend: String,

    /// Currently bound hotkey, if any.
    pub hotkey: Option<BoundHotkey>,

    /// Current injection target, if any.
    pub target: Option<TargetWindowHandle>,

    /// Key the hold toggle operates on.
    pub held_key: KeyCode,

    /// Whether a hold is active right now.
    pub holding: bool,

    /// Uptime in seconds.
    pub uptime_secs: u64,
}

impl Default for DaemonStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: String::new(),
            hotkey: None,
            target: None,
            held_key: KeyCode::NONE,
            holding: false,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::BindHotkey {
            modifiers: ModifierSet::CONTROL | ModifierSet::SHIFT,
            key: KeyCode::F1,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("bind_hotkey"));
        assert!(json.contains("112"));
    }

    #[test]
    fn test_request_round_trip() {
        let req = Request::SetTarget {
            target: Some(TargetWindowHandle::from_raw(0x42)),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back,
            Request::SetTarget { target: Some(t) } if t.as_raw() == 0x42
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(DaemonStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Notification::Event {
            event: DaemonEvent::HotkeyCleared,
        };
        let json = serde_json::to_string(&notification).unwrap();
        assert!(json.contains("\"event\""));
        assert!(json.contains("hotkey_cleared"));
    }

    #[test]
    fn test_clear_hotkey_parses_from_plain_tag() {
        let req: Request = serde_json::from_str(r#"{"type":"clear_hotkey"}"#).unwrap();
        assert!(matches!(req, Request::ClearHotkey));
    }
}
