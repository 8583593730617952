//! Board description for the Pico-based button box.
//!
//! Pin tables, the switch matrix layout and the input sources built from
//! them. Everything here is fixed at compile time.

use controller_core::{
    BackendKind, Button, Clock, DebounceConfig, DebouncedGpioButtonInput, DebouncedSwitchMatrixInput,
    DiodeDirection, GpioButtonMapping, InputSource, InputState, MatrixError, MatrixLayout,
};
use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pull};
use embassy_rp::Peri;
use embassy_time::Instant;

#[cfg(feature = "nunchuk")]
use controller_core::NunchukInput;

/// Held at power-on to reboot into the USB bootloader.
pub const RECOVERY_BUTTON: Button = Button::RT2;

pub const DEBOUNCE: DebounceConfig = DebounceConfig::DEFAULT;

/// Backends this build has a transport for.
pub const AVAILABLE_BACKENDS: &[BackendKind] = &[
    BackendKind::HidGamepad,
    #[cfg(feature = "input-viewer")]
    BackendKind::InputViewer,
];

/// Total on-board flash. The config lives in the last erase sector.
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const CONFIG_OFFSET: u32 = (FLASH_SIZE - embassy_rp::flash::ERASE_SIZE) as u32;

pub const MATRIX_ROWS: usize = 3;
pub const MATRIX_COLS: usize = 4;

/// Rows on GPIO 0, 1, 2; columns on GPIO 6, 5, 4, 3.
pub const MATRIX_LAYOUT: MatrixLayout<MATRIX_ROWS, MATRIX_COLS> = [
    [Some(Button::LF8), Some(Button::LF7), Some(Button::LF6), Some(Button::LF5)],
    [Some(Button::LF4), Some(Button::LF3), Some(Button::LF2), Some(Button::LF1)],
    [Some(Button::LT5), Some(Button::LT4), Some(Button::LT3), Some(Button::LT2)],
];

pub const DIODE_DIRECTION: DiodeDirection = DiodeDirection::Col2Row;

pub const GPIO_BUTTON_COUNT: usize = 17;

/// Directly wired buttons, in the order their pins are passed to
/// [`gpio_buttons`]: GPIO 7 through 22, then 26.
pub const GPIO_BUTTONS: [Button; GPIO_BUTTON_COUNT] = [
    Button::LT1, // 7
    Button::MB3, // 8
    Button::MB1, // 9
    Button::MB2, // 10
    Button::RT1, // 11
    Button::RT2, // 12
    Button::RT3, // 13
    Button::RT4, // 14
    Button::RT5, // 15
    Button::RF8, // 16
    Button::RF4, // 17
    Button::RF7, // 18
    Button::RF3, // 19
    Button::RF6, // 20
    Button::RF2, // 21
    Button::RF5, // 22
    Button::RF1, // 26
];

/// Microsecond clock backed by the embassy time driver. Readable from
/// either core.
#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}

pub type GpioButtons = DebouncedGpioButtonInput<Input<'static>, EmbassyClock, GPIO_BUTTON_COUNT>;

pub type SwitchMatrix = DebouncedSwitchMatrixInput<
    Output<'static>,
    Input<'static>,
    EmbassyClock,
    MATRIX_ROWS,
    MATRIX_COLS,
>;

#[cfg(feature = "nunchuk")]
pub type Nunchuk = NunchukInput<
    embassy_rp::i2c::I2c<'static, embassy_rp::peripherals::I2C0, embassy_rp::i2c::Blocking>,
    embassy_time::Delay,
>;

/// Pins follow [`GPIO_BUTTONS`] order. Buttons pull to ground.
pub fn gpio_buttons(pins: [Peri<'static, AnyPin>; GPIO_BUTTON_COUNT]) -> GpioButtons {
    let mut index = 0;
    let mappings = pins.map(|pin| {
        let mapping = GpioButtonMapping::new(GPIO_BUTTONS[index], Input::new(pin, Pull::Up));
        index += 1;
        mapping
    });
    DebouncedGpioButtonInput::new(mappings, EmbassyClock, DEBOUNCE)
}

pub fn switch_matrix(
    rows: [Peri<'static, AnyPin>; MATRIX_ROWS],
    cols: [Peri<'static, AnyPin>; MATRIX_COLS],
) -> Result<SwitchMatrix, MatrixError> {
    DebouncedSwitchMatrixInput::new(
        rows.map(|pin| Output::new(pin, Level::High)),
        cols.map(|pin| Input::new(pin, Pull::Up)),
        MATRIX_LAYOUT,
        DIODE_DIRECTION,
        EmbassyClock,
        DEBOUNCE,
    )
}

/// Every input source the board carries.
pub enum BoardInput {
    Gpio(GpioButtons),
    Matrix(SwitchMatrix),
    #[cfg(feature = "nunchuk")]
    Nunchuk(Nunchuk),
}

impl InputSource for BoardInput {
    fn update_inputs(&mut self, state: &mut InputState) {
        match self {
            Self::Gpio(source) => source.update_inputs(state),
            Self::Matrix(source) => source.update_inputs(state),
            #[cfg(feature = "nunchuk")]
            Self::Nunchuk(source) => source.update_inputs(state),
        }
    }

    fn poll_immediate(&mut self, state: &mut InputState) {
        match self {
            Self::Gpio(source) => source.poll_immediate(state),
            Self::Matrix(source) => source.poll_immediate(state),
            #[cfg(feature = "nunchuk")]
            Self::Nunchuk(source) => source.poll_immediate(state),
        }
    }
}
