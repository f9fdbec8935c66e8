//! Structured daemon events.
//!
//! Emitted on a broadcast channel whenever the binding, target or hold state
//! changes, and relayed to subscribed IPC clients.

use serde::{Deserialize, Serialize};

use crate::inject::TargetWindowHandle;
use crate::keys::{KeyCode, ModifierSet};

/// Events emitted by the daemon as its state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonEvent {
    /// A hotkey combination was registered.
    HotkeyBound {
        modifiers: ModifierSet,
        key: KeyCode,
    },

    /// The hotkey slot was released.
    HotkeyCleared,

    /// A hold began: key-down posted at the target.
    HoldStarted {
        key: KeyCode,
        target: TargetWindowHandle,
    },

    /// A hold ended: key-up posted at the target.
    HoldReleased {
        key: KeyCode,
        target: TargetWindowHandle,
        /// How long the key was held, in milliseconds.
        duration_ms: u64,
    },

    /// The injection target changed.
    TargetChanged { target: Option<TargetWindowHandle> },

    /// A key-down or key-up post failed.
    InjectionFailed { operation: String, message: String },
}

impl std::fmt::Display for DaemonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DaemonEvent::HotkeyBound { modifiers, key } => {
                write!(f, "HOTKEY_BOUND ({}+{})", modifiers, key)
            }
            DaemonEvent::HotkeyCleared => write!(f, "HOTKEY_CLEARED"),
            DaemonEvent::HoldStarted { key, target } => {
                write!(f, "HOLD_STARTED ({} at {})", key, target)
            }
            DaemonEvent::HoldReleased {
                key,
                target,
                duration_ms,
            } => write!(f, "HOLD_RELEASED ({} at {}, {}ms)", key, target, duration_ms),
            DaemonEvent::TargetChanged { target } => match target {
                Some(target) => write!(f, "TARGET_CHANGED ({})", target),
                None => write!(f, "TARGET_CHANGED (none)"),
            },
            DaemonEvent::InjectionFailed { operation, message } => {
                write!(f, "INJECTION_FAILED ({}: {})", operation, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DaemonEvent::HoldReleased {
            key: KeyCode::SPACE,
            target: TargetWindowHandle::from_raw(0x42),
            duration_ms: 1500,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("hold_released"));
        assert!(json.contains("1500"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"hotkey_cleared"}"#;
        let event: DaemonEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, DaemonEvent::HotkeyCleared));
    }

    #[test]
    fn test_display() {
        let event = DaemonEvent::HotkeyBound {
            modifiers: ModifierSet::CONTROL | ModifierSet::SHIFT,
            key: KeyCode::F1,
        };
        assert_eq!(event.to_string(), "HOTKEY_BOUND (Control+Shift+F1)");
    }
}
