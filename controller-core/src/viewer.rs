//! Input-viewer frame encoding.
//!
//! The viewer streams raw [`InputState`] (logical buttons, not the mapped
//! gamepad report) so an overlay can draw the physical layout.
//!
//! ```text
//! [0xA5][buttons u32 LE][lx][ly][rx][ry][lt][rt][flags][crc8]
//! ```
//!
//! CRC-8/SMBUS covers every byte between the sync byte and the CRC.

use crc::{Crc, CRC_8_SMBUS};

use crate::types::InputState;

/// CRC-8/SMBUS calculator with 256-byte lookup table.
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

pub const FRAME_SYNC: u8 = 0xA5;
pub const FRAME_LEN: usize = 13;

/// Flags bit: auxiliary stick present.
pub const FLAG_AUX: u8 = 1 << 0;

/// Calculate CRC-8 checksum of a byte slice.
#[inline]
#[must_use]
pub fn calculate_crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

#[must_use]
pub fn encode_frame(state: &InputState) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_SYNC;
    frame[1..5].copy_from_slice(&state.buttons.raw().to_le_bytes());
    frame[5] = state.left_stick.x;
    frame[6] = state.left_stick.y;
    frame[7] = state.right_stick.x;
    frame[8] = state.right_stick.y;
    frame[9] = state.left_trigger;
    frame[10] = state.right_trigger;
    frame[11] = if state.aux_present { FLAG_AUX } else { 0 };
    frame[FRAME_LEN - 1] = calculate_crc8(&frame[1..FRAME_LEN - 1]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalogStick, Button};

    #[test]
    fn test_crc8_empty() {
        assert_eq!(calculate_crc8(&[]), 0x00);
    }

    #[test]
    fn test_neutral_frame() {
        let frame = encode_frame(&InputState::neutral());
        assert_eq!(frame[0], FRAME_SYNC);
        assert_eq!(&frame[1..5], &[0, 0, 0, 0]);
        assert_eq!(&frame[5..9], &[128, 128, 128, 128]);
        assert_eq!(frame[11], 0);
        assert_eq!(frame[12], calculate_crc8(&frame[1..12]));
    }

    #[test]
    fn test_frame_fields() {
        let mut state = InputState::neutral();
        state.press(Button::LF1);
        state.press(Button::NunchukZ);
        state.left_stick = AnalogStick::new(3, 250);
        state.right_trigger = 77;
        state.aux_present = true;

        let frame = encode_frame(&state);
        assert_eq!(
            u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]),
            Button::LF1.mask() | Button::NunchukZ.mask()
        );
        assert_eq!(frame[5], 3);
        assert_eq!(frame[6], 250);
        assert_eq!(frame[10], 77);
        assert_eq!(frame[11], FLAG_AUX);
    }

    #[test]
    fn test_crc_detects_flip() {
        let mut frame = encode_frame(&InputState::neutral());
        frame[3] ^= 0x10;
        assert_ne!(frame[12], calculate_crc8(&frame[1..12]));
    }
}
