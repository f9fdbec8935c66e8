//! Modifier key flag set shared by hotkey bindings and decoded notifications.
//!
//! Bit values match the platform registration ABI (Alt = 0x0001,
//! Control = 0x0002, Shift = 0x0004, Meta = 0x0008), so a set converts to
//! and from raw notification payloads without translation tables.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Immutable bitmask of modifier keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierSet(u16);

impl ModifierSet {
    /// The empty set. Not a valid hotkey modifier on its own.
    pub const NONE: ModifierSet = ModifierSet(0x0000);
    pub const ALT: ModifierSet = ModifierSet(0x0001);
    pub const CONTROL: ModifierSet = ModifierSet(0x0002);
    pub const SHIFT: ModifierSet = ModifierSet(0x0004);
    /// The OS/"Windows"/"Command" key.
    pub const META: ModifierSet = ModifierSet(0x0008);

    /// Reconstruct a set from raw notification bits. All bits are kept as-is
    /// so a decoded payload re-encodes to the identical raw value.
    pub const fn from_bits(bits: u16) -> Self {
        ModifierSet(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is also set in `self`.
    pub const fn contains(self, other: ModifierSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: ModifierSet) -> ModifierSet {
        ModifierSet(self.0 | other.0)
    }
}

impl BitOr for ModifierSet {
    type Output = ModifierSet;

    fn bitor(self, rhs: ModifierSet) -> ModifierSet {
        self.union(rhs)
    }
}

impl BitOrAssign for ModifierSet {
    fn bitor_assign(&mut self, rhs: ModifierSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }

        let mut first = true;
        for (flag, name) in [
            (ModifierSet::CONTROL, "Control"),
            (ModifierSet::ALT, "Alt"),
            (ModifierSet::SHIFT, "Shift"),
            (ModifierSet::META, "Meta"),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, "+")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        assert!(ModifierSet::NONE.is_empty());
        assert!(!ModifierSet::CONTROL.is_empty());
    }

    #[test]
    fn test_union_and_membership() {
        let set = ModifierSet::CONTROL | ModifierSet::SHIFT;
        assert!(set.contains(ModifierSet::CONTROL));
        assert!(set.contains(ModifierSet::SHIFT));
        assert!(!set.contains(ModifierSet::ALT));
        assert!(set.contains(ModifierSet::CONTROL | ModifierSet::SHIFT));
    }

    #[test]
    fn test_abi_bit_values() {
        assert_eq!(ModifierSet::ALT.bits(), 0x0001);
        assert_eq!(ModifierSet::CONTROL.bits(), 0x0002);
        assert_eq!(ModifierSet::SHIFT.bits(), 0x0004);
        assert_eq!(ModifierSet::META.bits(), 0x0008);
    }

    #[test]
    fn test_bits_round_trip() {
        let set = ModifierSet::CONTROL | ModifierSet::META;
        assert_eq!(ModifierSet::from_bits(set.bits()), set);
    }

    #[test]
    fn test_display() {
        assert_eq!(ModifierSet::NONE.to_string(), "None");
        assert_eq!(
            (ModifierSet::CONTROL | ModifierSet::SHIFT).to_string(),
            "Control+Shift"
        );
    }

    #[test]
    fn test_serde_as_raw_bits() {
        let set = ModifierSet::CONTROL | ModifierSet::SHIFT;
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "6");
        let back: ModifierSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
