//! Translation between the portable key model and macOS event types.
//!
//! Hotkey bindings and injected keys carry portable virtual-key codes; the
//! CGEventTap callbacks and posted CGEvents speak macOS hardware keycodes and
//! CGEventFlags. Keys without a macOS equivalent simply have no mapping and
//! are rejected at registration/injection time.

use core_graphics::event::CGEventFlags;

use super::{KeyCode, ModifierSet};

/// macOS virtual keycode for a portable key, if the key exists on macOS.
pub(crate) fn mac_keycode(key: KeyCode) -> Option<u16> {
    let code = match key {
        KeyCode::A => 0x00,
        KeyCode::S => 0x01,
        KeyCode::D => 0x02,
        KeyCode::F => 0x03,
        KeyCode::H => 0x04,
        KeyCode::G => 0x05,
        KeyCode::Z => 0x06,
        KeyCode::X => 0x07,
        KeyCode::C => 0x08,
        KeyCode::V => 0x09,
        KeyCode::B => 0x0B,
        KeyCode::Q => 0x0C,
        KeyCode::W => 0x0D,
        KeyCode::E => 0x0E,
        KeyCode::R => 0x0F,
        KeyCode::Y => 0x10,
        KeyCode::T => 0x11,
        KeyCode::DIGIT_1 => 0x12,
        KeyCode::DIGIT_2 => 0x13,
        KeyCode::DIGIT_3 => 0x14,
        KeyCode::DIGIT_4 => 0x15,
        KeyCode::DIGIT_6 => 0x16,
        KeyCode::DIGIT_5 => 0x17,
        KeyCode::EQUAL => 0x18,
        KeyCode::DIGIT_9 => 0x19,
        KeyCode::DIGIT_7 => 0x1A,
        KeyCode::MINUS => 0x1B,
        KeyCode::DIGIT_8 => 0x1C,
        KeyCode::DIGIT_0 => 0x1D,
        KeyCode::BRACKET_RIGHT => 0x1E,
        KeyCode::O => 0x1F,
        KeyCode::U => 0x20,
        KeyCode::BRACKET_LEFT => 0x21,
        KeyCode::I => 0x22,
        KeyCode::P => 0x23,
        KeyCode::RETURN => 0x24,
        KeyCode::L => 0x25,
        KeyCode::J => 0x26,
        KeyCode::QUOTE => 0x27,
        KeyCode::K => 0x28,
        KeyCode::SEMICOLON => 0x29,
        KeyCode::BACKSLASH => 0x2A,
        KeyCode::COMMA => 0x2B,
        KeyCode::SLASH => 0x2C,
        KeyCode::N => 0x2D,
        KeyCode::M => 0x2E,
        KeyCode::PERIOD => 0x2F,
        KeyCode::TAB => 0x30,
        KeyCode::SPACE => 0x31,
        KeyCode::BACKQUOTE => 0x32,
        KeyCode::BACK => 0x33,
        KeyCode::ESCAPE => 0x35,
        KeyCode::F5 => 0x60,
        KeyCode::F6 => 0x61,
        KeyCode::F7 => 0x62,
        KeyCode::F3 => 0x63,
        KeyCode::F8 => 0x64,
        KeyCode::F9 => 0x65,
        KeyCode::F11 => 0x67,
        KeyCode::F13 => 0x69,
        KeyCode::F14 => 0x6B,
        KeyCode::F10 => 0x6D,
        KeyCode::F12 => 0x6F,
        KeyCode::F15 => 0x71,
        KeyCode::HELP => 0x72,
        KeyCode::HOME => 0x73,
        KeyCode::PAGE_UP => 0x74,
        KeyCode::DELETE => 0x75,
        KeyCode::F4 => 0x76,
        KeyCode::END => 0x77,
        KeyCode::F2 => 0x78,
        KeyCode::PAGE_DOWN => 0x79,
        KeyCode::F1 => 0x7A,
        KeyCode::LEFT => 0x7B,
        KeyCode::RIGHT => 0x7C,
        KeyCode::DOWN => 0x7D,
        KeyCode::UP => 0x7E,
        _ => return None,
    };
    Some(code)
}

/// Extract the portable modifier set from tap callback flags.
pub(crate) fn modifiers_from_flags(flags: CGEventFlags) -> ModifierSet {
    let mut set = ModifierSet::NONE;
    if flags.contains(CGEventFlags::CGEventFlagControl) {
        set |= ModifierSet::CONTROL;
    }
    if flags.contains(CGEventFlags::CGEventFlagAlternate) {
        set |= ModifierSet::ALT;
    }
    if flags.contains(CGEventFlags::CGEventFlagShift) {
        set |= ModifierSet::SHIFT;
    }
    if flags.contains(CGEventFlags::CGEventFlagCommand) {
        set |= ModifierSet::META;
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_and_function_keys_map() {
        assert_eq!(mac_keycode(KeyCode::A), Some(0x00));
        assert_eq!(mac_keycode(KeyCode::F1), Some(0x7A));
        assert_eq!(mac_keycode(KeyCode::SPACE), Some(0x31));
    }

    #[test]
    fn test_windows_only_keys_do_not_map() {
        assert_eq!(mac_keycode(KeyCode::NONE), None);
        assert_eq!(mac_keycode(KeyCode::BROWSER_BACK), None);
        assert_eq!(mac_keycode(KeyCode::PRINT_SCREEN), None);
    }

    #[test]
    fn test_modifier_flag_translation() {
        let flags = CGEventFlags::CGEventFlagControl | CGEventFlags::CGEventFlagShift;
        assert_eq!(
            modifiers_from_flags(flags),
            ModifierSet::CONTROL | ModifierSet::SHIFT
        );
    }
}
