//! Hotkey notification payload encoding.
//!
//! A fired hotkey arrives as a 32-bit payload with the modifier flags in the
//! low 16 bits and the virtual-key code in the high 16 bits. The layout is
//! part of the platform event ABI and is reproduced exactly.

use crate::keys::{KeyCode, ModifierSet};

/// Message id delivered when a registered combination fires.
pub const HOTKEY_NOTIFY: u32 = 0x0312;

/// One hotkey activation, decoded into the semantic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyEvent {
    pub modifiers: ModifierSet,
    pub key: KeyCode,
}

/// Decode a raw notification payload.
pub fn decode_payload(raw: u32) -> HotkeyEvent {
    HotkeyEvent {
        modifiers: ModifierSet::from_bits((raw & 0xFFFF) as u16),
        key: KeyCode::from_raw(((raw >> 16) & 0xFFFF) as u16),
    }
}

/// Encode a combination into the raw payload layout.
pub fn encode_payload(modifiers: ModifierSet, key: KeyCode) -> u32 {
    ((key.raw() as u32) << 16) | modifiers.bits() as u32
}
