//! Virtual key identifiers.
//!
//! `KeyCode` is an opaque identifier over the platform's 16-bit virtual-key
//! universe. The named subset below is what the picker UI enumerates; raw
//! values outside it still round-trip through notifications unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a physical/virtual key. `KeyCode::NONE` means "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(u16);

macro_rules! key_codes {
    ($($konst:ident = $value:literal => $label:literal,)+) => {
        impl KeyCode {
            $(pub const $konst: KeyCode = KeyCode($value);)+

            /// Every named key, in ascending code order. Used to populate
            /// the external picker list.
            pub const ALL: &'static [KeyCode] = &[$(KeyCode($value),)+];

            /// Canonical name of a known key.
            pub fn name(self) -> Option<&'static str> {
                match self.0 {
                    $($value => Some($label),)+
                    _ => None,
                }
            }
        }
    };
}

key_codes! {
    NONE = 0x00 => "None",
    BACK = 0x08 => "Backspace",
    TAB = 0x09 => "Tab",
    CLEAR = 0x0C => "Clear",
    RETURN = 0x0D => "Enter",
    SHIFT_KEY = 0x10 => "Shift",
    CONTROL_KEY = 0x11 => "Control",
    ALT_KEY = 0x12 => "Alt",
    PAUSE = 0x13 => "Pause",
    CAPS_LOCK = 0x14 => "CapsLock",
    ESCAPE = 0x1B => "Escape",
    SPACE = 0x20 => "Space",
    PAGE_UP = 0x21 => "PageUp",
    PAGE_DOWN = 0x22 => "PageDown",
    END = 0x23 => "End",
    HOME = 0x24 => "Home",
    LEFT = 0x25 => "Left",
    UP = 0x26 => "Up",
    RIGHT = 0x27 => "Right",
    DOWN = 0x28 => "Down",
    SELECT = 0x29 => "Select",
    PRINT = 0x2A => "Print",
    EXECUTE = 0x2B => "Execute",
    PRINT_SCREEN = 0x2C => "PrintScreen",
    INSERT = 0x2D => "Insert",
    DELETE = 0x2E => "Delete",
    HELP = 0x2F => "Help",
    DIGIT_0 = 0x30 => "0",
    DIGIT_1 = 0x31 => "1",
    DIGIT_2 = 0x32 => "2",
    DIGIT_3 = 0x33 => "3",
    DIGIT_4 = 0x34 => "4",
    DIGIT_5 = 0x35 => "5",
    DIGIT_6 = 0x36 => "6",
    DIGIT_7 = 0x37 => "7",
    DIGIT_8 = 0x38 => "8",
    DIGIT_9 = 0x39 => "9",
    A = 0x41 => "A",
    B = 0x42 => "B",
    C = 0x43 => "C",
    D = 0x44 => "D",
    E = 0x45 => "E",
    F = 0x46 => "F",
    G = 0x47 => "G",
    H = 0x48 => "H",
    I = 0x49 => "I",
    J = 0x4A => "J",
    K = 0x4B => "K",
    L = 0x4C => "L",
    M = 0x4D => "M",
    N = 0x4E => "N",
    O = 0x4F => "O",
    P = 0x50 => "P",
    Q = 0x51 => "Q",
    R = 0x52 => "R",
    S = 0x53 => "S",
    T = 0x54 => "T",
    U = 0x55 => "U",
    V = 0x56 => "V",
    W = 0x57 => "W",
    X = 0x58 => "X",
    Y = 0x59 => "Y",
    Z = 0x5A => "Z",
    LEFT_META = 0x5B => "LeftMeta",
    RIGHT_META = 0x5C => "RightMeta",
    APPS = 0x5D => "Apps",
    SLEEP = 0x5F => "Sleep",
    NUMPAD_0 = 0x60 => "Numpad0",
    NUMPAD_1 = 0x61 => "Numpad1",
    NUMPAD_2 = 0x62 => "Numpad2",
    NUMPAD_3 = 0x63 => "Numpad3",
    NUMPAD_4 = 0x64 => "Numpad4",
    NUMPAD_5 = 0x65 => "Numpad5",
    NUMPAD_6 = 0x66 => "Numpad6",
    NUMPAD_7 = 0x67 => "Numpad7",
    NUMPAD_8 = 0x68 => "Numpad8",
    NUMPAD_9 = 0x69 => "Numpad9",
    NUMPAD_MULTIPLY = 0x6A => "NumpadMultiply",
    NUMPAD_ADD = 0x6B => "NumpadAdd",
    NUMPAD_SEPARATOR = 0x6C => "NumpadSeparator",
    NUMPAD_SUBTRACT = 0x6D => "NumpadSubtract",
    NUMPAD_DECIMAL = 0x6E => "NumpadDecimal",
    NUMPAD_DIVIDE = 0x6F => "NumpadDivide",
    F1 = 0x70 => "F1",
    F2 = 0x71 => "F2",
    F3 = 0x72 => "F3",
    F4 = 0x73 => "F4",
    F5 = 0x74 => "F5",
    F6 = 0x75 => "F6",
    F7 = 0x76 => "F7",
    F8 = 0x77 => "F8",
    F9 = 0x78 => "F9",
    F10 = 0x79 => "F10",
    F11 = 0x7A => "F11",
    F12 = 0x7B => "F12",
    F13 = 0x7C => "F13",
    F14 = 0x7D => "F14",
    F15 = 0x7E => "F15",
    F16 = 0x7F => "F16",
    F17 = 0x80 => "F17",
    F18 = 0x81 => "F18",
    F19 = 0x82 => "F19",
    F20 = 0x83 => "F20",
    F21 = 0x84 => "F21",
    F22 = 0x85 => "F22",
    F23 = 0x86 => "F23",
    F24 = 0x87 => "F24",
    NUM_LOCK = 0x90 => "NumLock",
    SCROLL_LOCK = 0x91 => "ScrollLock",
    LEFT_SHIFT = 0xA0 => "LeftShift",
    RIGHT_SHIFT = 0xA1 => "RightShift",
    LEFT_CONTROL = 0xA2 => "LeftControl",
    RIGHT_CONTROL = 0xA3 => "RightControl",
    LEFT_ALT = 0xA4 => "LeftAlt",
    RIGHT_ALT = 0xA5 => "RightAlt",
    BROWSER_BACK = 0xA6 => "BrowserBack",
    BROWSER_FORWARD = 0xA7 => "BrowserForward",
    BROWSER_REFRESH = 0xA8 => "BrowserRefresh",
    BROWSER_STOP = 0xA9 => "BrowserStop",
    BROWSER_SEARCH = 0xAA => "BrowserSearch",
    BROWSER_FAVORITES = 0xAB => "BrowserFavorites",
    BROWSER_HOME = 0xAC => "BrowserHome",
    VOLUME_MUTE = 0xAD => "VolumeMute",
    VOLUME_DOWN = 0xAE => "VolumeDown",
    VOLUME_UP = 0xAF => "VolumeUp",
    MEDIA_NEXT = 0xB0 => "MediaNext",
    MEDIA_PREVIOUS = 0xB1 => "MediaPrevious",
    MEDIA_STOP = 0xB2 => "MediaStop",
    MEDIA_PLAY_PAUSE = 0xB3 => "MediaPlayPause",
    SEMICOLON = 0xBA => "Semicolon",
    EQUAL = 0xBB => "Equal",
    COMMA = 0xBC => "Comma",
    MINUS = 0xBD => "Minus",
    PERIOD = 0xBE => "Period",
    SLASH = 0xBF => "Slash",
    BACKQUOTE = 0xC0 => "Backquote",
    BRACKET_LEFT = 0xDB => "BracketLeft",
    BACKSLASH = 0xDC => "Backslash",
    BRACKET_RIGHT = 0xDD => "BracketRight",
    QUOTE = 0xDE => "Quote",
    INTL_BACKSLASH = 0xE2 => "IntlBackslash",
}

impl KeyCode {
    /// Reconstruct a key from raw notification bits.
    pub const fn from_raw(raw: u16) -> Self {
        KeyCode(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Key(0x{:02X})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel() {
        assert!(KeyCode::NONE.is_none());
        assert!(!KeyCode::F1.is_none());
        assert_eq!(KeyCode::default(), KeyCode::NONE);
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(KeyCode::F1.raw(), 0x70);
        assert_eq!(KeyCode::A.raw(), 0x41);
        assert_eq!(KeyCode::SPACE.raw(), 0x20);
    }

    #[test]
    fn test_names() {
        assert_eq!(KeyCode::F1.name(), Some("F1"));
        assert_eq!(KeyCode::RETURN.name(), Some("Enter"));
        assert_eq!(KeyCode::from_raw(0xE9).name(), None);
    }

    #[test]
    fn test_display_falls_back_to_hex() {
        assert_eq!(KeyCode::F1.to_string(), "F1");
        assert_eq!(KeyCode::from_raw(0xE9).to_string(), "Key(0xE9)");
    }

    #[test]
    fn test_all_is_named_and_sorted() {
        assert!(KeyCode::ALL.len() > 100);
        for key in KeyCode::ALL {
            assert!(key.name().is_some());
        }
        for pair in KeyCode::ALL.windows(2) {
            assert!(pair[0].raw() < pair[1].raw());
        }
    }

    #[test]
    fn test_raw_round_trip() {
        let key = KeyCode::from_raw(0x1234);
        assert_eq!(KeyCode::from_raw(key.raw()), key);
    }

    #[test]
    fn test_serde_as_raw_value() {
        let json = serde_json::to_string(&KeyCode::F1).unwrap();
        assert_eq!(json, "112");
        let back: KeyCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, KeyCode::F1);
    }
}
