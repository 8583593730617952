//! Keyboard modes: map logical buttons to HID keyboard usages.

use core::future::Future;
use serde::{Deserialize, Serialize};

use crate::backend::BackendError;
use crate::types::{Button, InputState};

/// Maximum bindings in one keymap.
pub const MAX_KEYS: usize = 32;

/// Keys per boot-protocol report.
pub const REPORT_KEYS: usize = 6;

/// First and last HID usage of the modifier block (LeftCtrl..RightGUI).
const MODIFIER_FIRST: u8 = 0xE0;
const MODIFIER_LAST: u8 = 0xE7;

/// One button to HID keyboard usage code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyBinding {
    pub button: Button,
    pub keycode: u8,
}

impl KeyBinding {
    pub const fn new(button: Button, keycode: u8) -> Self {
        Self { button, keycode }
    }

    /// Usages 0x04..=0x73 (keys) and the modifier block are accepted.
    pub const fn is_valid(&self) -> bool {
        matches!(self.keycode, 0x04..=0x73 | MODIFIER_FIRST..=MODIFIER_LAST)
    }
}

/// Boot-protocol keyboard report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyReport {
    pub modifier: u8,
    pub keycodes: [u8; REPORT_KEYS],
}

impl KeyReport {
    pub const SIZE: usize = 8;

    /// Wire layout: modifier, reserved, six keys.
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let k = self.keycodes;
        [self.modifier, 0, k[0], k[1], k[2], k[3], k[4], k[5]]
    }
}

/// A keyboard mode built from a keymap.
pub struct KeyboardMode {
    keymap: heapless::Vec<KeyBinding, MAX_KEYS>,
}

impl KeyboardMode {
    pub fn new(keymap: &[KeyBinding]) -> Self {
        let mut map = heapless::Vec::new();
        for binding in keymap.iter().take(MAX_KEYS) {
            // Capacity is guaranteed by `take`.
            let _ = map.push(*binding);
        }
        Self { keymap: map }
    }

    /// Build a report. Keys beyond six are dropped in keymap order.
    pub fn report(&self, input: &InputState) -> KeyReport {
        let mut report = KeyReport::default();
        let mut n = 0;
        for binding in &self.keymap {
            if !input.is_pressed(binding.button) {
                continue;
            }
            match binding.keycode {
                code @ MODIFIER_FIRST..=MODIFIER_LAST => {
                    report.modifier |= 1 << (code - MODIFIER_FIRST);
                }
                code => {
                    if n < REPORT_KEYS && !report.keycodes[..n].contains(&code) {
                        report.keycodes[n] = code;
                        n += 1;
                    }
                }
            }
        }
        report
    }
}

/// Transport for keyboard reports.
pub trait KeyboardSink {
    fn send(&mut self, report: &KeyReport) -> impl Future<Output = Result<(), BackendError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYMAP: [KeyBinding; 9] = [
        KeyBinding::new(Button::LF1, 0x04),
        KeyBinding::new(Button::LF2, 0x05),
        KeyBinding::new(Button::LF3, 0x06),
        KeyBinding::new(Button::LF4, 0x07),
        KeyBinding::new(Button::RF1, 0x08),
        KeyBinding::new(Button::RF2, 0x09),
        KeyBinding::new(Button::RF3, 0x0A),
        KeyBinding::new(Button::RF4, 0x04),
        KeyBinding::new(Button::MB1, 0xE1),
    ];

    fn held(buttons: &[Button]) -> InputState {
        let mut s = InputState::neutral();
        for b in buttons {
            s.press(*b);
        }
        s
    }

    #[test]
    fn test_keys_in_keymap_order() {
        let mode = KeyboardMode::new(&KEYMAP);
        let r = mode.report(&held(&[Button::RF1, Button::LF2]));
        assert_eq!(r.keycodes, [0x05, 0x08, 0, 0, 0, 0]);
        assert_eq!(r.modifier, 0);
    }

    #[test]
    fn test_modifier_bit() {
        let mode = KeyboardMode::new(&KEYMAP);
        let r = mode.report(&held(&[Button::MB1, Button::LF1]));
        assert_eq!(r.modifier, 0b0000_0010);
        assert_eq!(r.as_bytes(), [0x02, 0, 0x04, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_rollover_limit_and_duplicates() {
        let mode = KeyboardMode::new(&KEYMAP);
        let all = held(&[
            Button::LF1,
            Button::LF2,
            Button::LF3,
            Button::LF4,
            Button::RF1,
            Button::RF2,
            Button::RF3,
            Button::RF4,
        ]);
        let r = mode.report(&all);
        assert_eq!(r.keycodes, [0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn test_keycode_validity() {
        assert!(KeyBinding::new(Button::LF1, 0x04).is_valid());
        assert!(KeyBinding::new(Button::LF1, 0xE7).is_valid());
        assert!(!KeyBinding::new(Button::LF1, 0x00).is_valid());
        assert!(!KeyBinding::new(Button::LF1, 0x80).is_valid());
    }
}
