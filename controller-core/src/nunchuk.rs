//! Wii Nunchuk as an auxiliary input (analog stick plus C and Z).

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::input::InputSource;
use crate::types::{AnalogStick, Button, InputState};

/// 7-bit I2C address of the Nunchuk.
pub const NUNCHUK_ADDR: u8 = 0x52;

/// Unencrypted init sequence for third-party and genuine units alike.
const INIT_SEQUENCE: [[u8; 2]; 2] = [[0xF0, 0x55], [0xFB, 0x00]];

/// Time the device needs between the read request and the data read.
const CONVERSION_DELAY_US: u32 = 200;

/// Passes to wait before trying to re-initialise an absent device.
const RETRY_INTERVAL: u16 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NunchukError {
    /// Transaction NACKed or the bus faulted.
    Bus,
}

/// One decoded Nunchuk report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NunchukReport {
    pub stick: AnalogStick,
    pub c: bool,
    pub z: bool,
}

impl NunchukReport {
    /// Decode the 6-byte report. Buttons are active-low in byte 5.
    pub fn decode(raw: &[u8; 6]) -> Self {
        Self {
            stick: AnalogStick::new(raw[0], raw[1]),
            z: raw[5] & 0x01 == 0,
            c: raw[5] & 0x02 == 0,
        }
    }
}

/// Nunchuk on a blocking I2C bus.
///
/// Bus errors are absorbed: the device is treated as unplugged (stick
/// neutral, no buttons, aux flag cleared) and re-initialised later.
pub struct NunchukInput<I2C, D> {
    i2c: I2C,
    delay: D,
    connected: bool,
    backoff: u16,
}

impl<I2C: I2c, D: DelayNs> NunchukInput<I2C, D> {
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            connected: false,
            backoff: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn init(&mut self) -> Result<(), NunchukError> {
        for cmd in &INIT_SEQUENCE {
            self.i2c
                .write(NUNCHUK_ADDR, cmd)
                .map_err(|_| NunchukError::Bus)?;
        }
        Ok(())
    }

    fn read(&mut self) -> Result<NunchukReport, NunchukError> {
        let mut raw = [0u8; 6];
        self.i2c
            .write(NUNCHUK_ADDR, &[0x00])
            .map_err(|_| NunchukError::Bus)?;
        self.delay.delay_us(CONVERSION_DELAY_US);
        self.i2c
            .read(NUNCHUK_ADDR, &mut raw)
            .map_err(|_| NunchukError::Bus)?;
        Ok(NunchukReport::decode(&raw))
    }

    /// Poll the device, (re)initialising it first if needed.
    pub fn poll(&mut self) -> Option<NunchukReport> {
        if !self.connected {
            if self.backoff > 0 {
                self.backoff -= 1;
                return None;
            }
            if self.init().is_err() {
                self.backoff = RETRY_INTERVAL;
                return None;
            }
            debug!("nunchuk initialised");
            self.connected = true;
        }

        match self.read() {
            Ok(report) => Some(report),
            Err(_) => {
                debug!("nunchuk lost");
                self.connected = false;
                self.backoff = RETRY_INTERVAL;
                None
            }
        }
    }
}

impl<I2C: I2c, D: DelayNs> InputSource for NunchukInput<I2C, D> {
    fn update_inputs(&mut self, state: &mut InputState) {
        let Some(report) = self.poll() else {
            return;
        };
        state.left_stick = report.stick;
        state.aux_present = true;
        if report.c {
            state.press(Button::NunchukC);
        }
        if report.z {
            state.press(Button::NunchukZ);
        }
    }

    /// The recovery button is never on the Nunchuk; skip the bus at boot.
    fn poll_immediate(&mut self, _state: &mut InputState) {}
}
