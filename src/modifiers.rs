//! Modifier bitmask and its decoding into independent flags.
//!
//! Several modifiers can be held at once, so every query tests membership
//! with `(mask & flag) == flag` rather than comparing the whole mask.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bitset of modifier keys held at the instant of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modifiers(u32);

impl Modifiers {
    /// Shift key.
    pub const SHIFT: Modifiers = Modifiers(1 << 0);
    /// Control key.
    pub const CONTROL: Modifiers = Modifiers(1 << 1);
    /// Alt/Option key.
    pub const ALT: Modifiers = Modifiers(1 << 2);
    /// Meta/Command/Windows key.
    pub const META: Modifiers = Modifiers(1 << 3);
    /// Caps Lock engaged.
    pub const CAPS_LOCK: Modifiers = Modifiers(1 << 4);
    /// Key originated on the numeric keypad.
    pub const NUMERIC_PAD: Modifiers = Modifiers(1 << 5);
    /// Function (Fn) key.
    pub const FUNCTION: Modifiers = Modifiers(1 << 6);

    /// All known modifier bits combined.
    pub const ALL: Modifiers = Modifiers(
        Self::SHIFT.0
            | Self::CONTROL.0
            | Self::ALT.0
            | Self::META.0
            | Self::CAPS_LOCK.0
            | Self::NUMERIC_PAD.0
            | Self::FUNCTION.0,
    );

    /// No modifiers held.
    #[inline]
    pub const fn empty() -> Self {
        Modifiers(0)
    }

    /// Build a mask from raw bits. Unknown bits are kept as-is.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Modifiers(bits)
    }

    /// Raw bit value.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check whether every bit of `flag` is set in this mask.
    #[inline]
    pub const fn contains(self, flag: Modifiers) -> bool {
        (self.0 & flag.0) == flag.0
    }

    /// Set the bits of `flag`.
    #[inline]
    pub fn insert(&mut self, flag: Modifiers) {
        self.0 |= flag.0;
    }

    /// Clear the bits of `flag`.
    #[inline]
    pub fn remove(&mut self, flag: Modifiers) {
        self.0 &= !flag.0;
    }

    /// Decode into independent boolean flags.
    pub fn decode(self) -> ModifierFlags {
        ModifierFlags {
            command: self.contains(Self::META),
            control: self.contains(Self::CONTROL),
            option: self.contains(Self::ALT),
            shift: self.contains(Self::SHIFT),
            caps_lock: self.contains(Self::CAPS_LOCK),
            numeric_pad: self.contains(Self::NUMERIC_PAD),
            function: self.contains(Self::FUNCTION),
        }
    }

    /// Human readable modifier list such as `"Shift+Ctrl"`.
    ///
    /// Returns an empty string when no known modifier is held.
    pub fn names(self) -> String {
        const NAMES: [(Modifiers, &str); 7] = [
            (Modifiers::META, "Meta"),
            (Modifiers::CONTROL, "Ctrl"),
            (Modifiers::ALT, "Alt"),
            (Modifiers::SHIFT, "Shift"),
            (Modifiers::CAPS_LOCK, "CapsLock"),
            (Modifiers::NUMERIC_PAD, "NumPad"),
            (Modifiers::FUNCTION, "Fn"),
        ];

        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Modifiers) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&self.names())
        }
    }
}

/// Modifier state decoded from a [`Modifiers`] mask.
///
/// `Default` is all-false, which is what queries report before any event
/// has been popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierFlags {
    /// Command/Meta/Windows key.
    pub command: bool,
    /// Control key.
    pub control: bool,
    /// Option/Alt key.
    pub option: bool,
    /// Shift key.
    pub shift: bool,
    /// Caps Lock.
    pub caps_lock: bool,
    /// Numeric keypad.
    pub numeric_pad: bool,
    /// Function key.
    pub function: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_shift_decode() {
        let mask = Modifiers::CONTROL | Modifiers::SHIFT;
        let flags = mask.decode();

        assert!(flags.control);
        assert!(flags.shift);
        assert!(!flags.command);
        assert!(!flags.option);
    }

    #[test]
    fn test_contains_uses_and_semantics() {
        let mask = Modifiers::ALT | Modifiers::META | Modifiers::CAPS_LOCK;

        assert!(mask.contains(Modifiers::ALT));
        assert!(mask.contains(Modifiers::META));
        assert!(mask.contains(Modifiers::ALT | Modifiers::META));
        assert!(!mask.contains(Modifiers::SHIFT));
        assert!(!mask.contains(Modifiers::ALT | Modifiers::SHIFT));
        assert_ne!(mask, Modifiers::ALT);
    }

    #[test]
    fn test_insert_remove() {
        let mut mask = Modifiers::empty();
        assert!(mask.is_empty());

        mask.insert(Modifiers::SHIFT);
        mask |= Modifiers::CONTROL;
        assert_eq!(mask.bits(), 0b11);

        mask.remove(Modifiers::SHIFT);
        assert_eq!(mask, Modifiers::CONTROL);
    }

    #[test]
    fn test_unknown_bits_are_ignored_by_decode() {
        let flags = Modifiers::from_bits(1 << 20).decode();
        assert_eq!(flags, ModifierFlags::default());
    }

    #[test]
    fn test_names() {
        assert_eq!(Modifiers::empty().names(), "");
        assert_eq!((Modifiers::SHIFT | Modifiers::CONTROL).names(), "Ctrl+Shift");
        assert_eq!(Modifiers::ALL.names(), "Meta+Ctrl+Alt+Shift+CapsLock+NumPad+Fn");
        assert_eq!(Modifiers::empty().to_string(), "(none)");
    }
}
