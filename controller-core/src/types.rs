//! Core input types: Button, Buttons, AnalogStick, InputState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use serde::{Deserialize, Serialize};

/// A logical button, independent of how it is wired (GPIO pin or matrix cell).
///
/// The discriminant is the bit index inside [`Buttons`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Button {
    // Left fingers
    LF1 = 0,
    LF2,
    LF3,
    LF4,
    LF5,
    LF6,
    LF7,
    LF8,
    // Left thumb
    LT1,
    LT2,
    LT3,
    LT4,
    LT5,
    // Middle
    MB1,
    MB2,
    MB3,
    // Right thumb
    RT1,
    RT2,
    RT3,
    RT4,
    RT5,
    // Right fingers
    RF1,
    RF2,
    RF3,
    RF4,
    RF5,
    RF6,
    RF7,
    RF8,
    // Auxiliary peripheral
    NunchukC,
    NunchukZ,
}

impl Button {
    /// Number of logical buttons.
    pub const COUNT: usize = 31;

    /// Every logical button in bit order.
    pub const ALL: [Button; Self::COUNT] = [
        Button::LF1,
        Button::LF2,
        Button::LF3,
        Button::LF4,
        Button::LF5,
        Button::LF6,
        Button::LF7,
        Button::LF8,
        Button::LT1,
        Button::LT2,
        Button::LT3,
        Button::LT4,
        Button::LT5,
        Button::MB1,
        Button::MB2,
        Button::MB3,
        Button::RT1,
        Button::RT2,
        Button::RT3,
        Button::RT4,
        Button::RT5,
        Button::RF1,
        Button::RF2,
        Button::RF3,
        Button::RF4,
        Button::RF5,
        Button::RF6,
        Button::RF7,
        Button::RF8,
        Button::NunchukC,
        Button::NunchukZ,
    ];

    /// Bit mask of this button inside a [`Buttons`] set.
    #[inline]
    #[must_use]
    pub const fn mask(self) -> u32 {
        1 << (self as u8)
    }
}

/// Set of held logical buttons, one bit per [`Button`].
///
/// Implements bitwise operators for ergonomic set manipulation.
///
/// # Example
///
/// ```
/// use controller_core::{Button, Buttons};
///
/// let held = Buttons::from(Button::MB1) | Button::LT1.into();
/// assert!(held.is_pressed(Button::MB1));
/// assert!(held.contains(Buttons::from(Button::LT1)));
/// assert!(!held.is_pressed(Button::RF1));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u32);

impl Buttons {
    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Build a set from a list of buttons.
    #[must_use]
    pub const fn of(buttons: &[Button]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < buttons.len() {
            bits |= buttons[i].mask();
            i += 1;
        }
        Self(bits)
    }

    /// Check if every button of `other` is held (subset test).
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Buttons) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if a single button is held.
    #[inline]
    #[must_use]
    pub const fn is_pressed(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    /// Set or clear a button.
    #[inline]
    pub fn set(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.0 |= button.mask();
        } else {
            self.0 &= !button.mask();
        }
    }

    /// Get the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Number of held buttons.
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Check if no buttons are held.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate over the held buttons in bit order.
    pub fn iter(self) -> impl Iterator<Item = Button> {
        Button::ALL.into_iter().filter(move |b| self.is_pressed(*b))
    }
}

impl From<Button> for Buttons {
    #[inline]
    fn from(button: Button) -> Self {
        Self(button.mask())
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Buttons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Buttons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Analog stick with X/Y axes.
///
/// Range: [0, 255], centered at [`AnalogStick::CENTER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: u8,
    pub y: u8,
}

impl AnalogStick {
    /// Axis value at rest.
    pub const CENTER: u8 = 128;

    pub const NEUTRAL: Self = Self {
        x: Self::CENTER,
        y: Self::CENTER,
    };

    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl Default for AnalogStick {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Canonical snapshot of every logical control.
///
/// Contains:
/// - 31 logical buttons (bitfield)
/// - 2 analog sticks (auxiliary/left, right), centered at 128
/// - 2 analog triggers (0-255)
/// - whether an auxiliary analog peripheral reported this pass
///
/// Acquisition builds one of these from scratch every pass; the result is
/// published through [`SharedInputState`](crate::shared::SharedInputState).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InputState {
    pub buttons: Buttons,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub aux_present: bool,
}

impl InputState {
    /// No buttons held, sticks centered, triggers released.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: Buttons::NONE,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
            aux_present: false,
        }
    }

    /// Check if a single button is held.
    #[inline]
    #[must_use]
    pub const fn is_pressed(&self, button: Button) -> bool {
        self.buttons.is_pressed(button)
    }

    /// Mark a button pressed. Never clears: sources merge by logical OR.
    #[inline]
    pub fn press(&mut self, button: Button) {
        self.buttons.set(button, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_masks_are_distinct() {
        let mut seen = 0u32;
        for b in Button::ALL {
            assert_eq!(seen & b.mask(), 0);
            seen |= b.mask();
        }
        assert_eq!(seen.count_ones() as usize, Button::COUNT);
        assert_eq!(Button::NunchukZ as u8, 30);
    }

    #[test]
    fn test_buttons_subset() {
        let held = Buttons::of(&[Button::MB1, Button::LT1, Button::LF4]);
        assert!(held.contains(Buttons::of(&[Button::MB1, Button::LF4])));
        assert!(!held.contains(Buttons::of(&[Button::MB1, Button::LF3])));
        assert!(held.contains(Buttons::NONE));
        assert_eq!(held.count(), 3);
    }

    #[test]
    fn test_buttons_set_clear() {
        let mut buttons = Buttons::NONE;
        buttons.set(Button::RF1, true);
        assert!(buttons.is_pressed(Button::RF1));
        buttons.set(Button::RF1, false);
        assert!(buttons.is_empty());
    }

    #[test]
    fn test_buttons_iter_in_bit_order() {
        let held = Buttons::of(&[Button::RF8, Button::LF1, Button::MB2]);
        let mut it = held.iter();
        assert_eq!(it.next(), Some(Button::LF1));
        assert_eq!(it.next(), Some(Button::MB2));
        assert_eq!(it.next(), Some(Button::RF8));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_input_state_neutral() {
        let state = InputState::neutral();
        assert_eq!(state, InputState::default());
        assert_eq!(state.left_stick, AnalogStick::NEUTRAL);
        assert!(!state.aux_present);
    }
}
