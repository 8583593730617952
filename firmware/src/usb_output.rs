//! USB HID gamepad backend.

use controller_core::{
    BackendError, Calibration, CommunicationBackend, ControllerMode, GameModeConfig, GameModeId,
    HidStick, OutputState, SharedInputState, SocdPolicy,
};
use defmt::Format;
use embassy_futures::poll_once;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::hid::{HidWriter, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;

pub type UsbDriver = Driver<'static, USB>;

/// USB HID Gamepad report structure.
///
/// This matches the HID report descriptor defined below.
/// Total size: 8 bytes (buttons: 2, sticks: 4x1, triggers: 2x1)
///
/// Sticks travel as `u8` centered at 128 with Y up internally; see
/// [`HidStick`] for the report orientation.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Format)]
#[repr(C)]
pub struct GamepadReport {
    /// Button bitfield (16 buttons)
    pub buttons: u16,
    /// Left stick X (-128 to 127)
    pub left_stick_x: i8,
    /// Left stick Y (-128 to 127)
    pub left_stick_y: i8,
    /// Right stick X (-128 to 127)
    pub right_stick_x: i8,
    /// Right stick Y (-128 to 127)
    pub right_stick_y: i8,
    /// Left trigger (0-255)
    pub left_trigger: u8,
    /// Right trigger (0-255)
    pub right_trigger: u8,
}

impl GamepadReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 8;

    /// Convert the report to bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let buttons_bytes = self.buttons.to_le_bytes();
        [
            buttons_bytes[0],
            buttons_bytes[1],
            self.left_stick_x as u8,
            self.left_stick_y as u8,
            self.right_stick_x as u8,
            self.right_stick_y as u8,
            self.left_trigger,
            self.right_trigger,
        ]
    }
}

impl From<&OutputState> for GamepadReport {
    fn from(state: &OutputState) -> Self {
        let left = HidStick::from(state.left_stick);
        let right = HidStick::from(state.right_stick);
        Self {
            buttons: state.buttons.raw(),
            left_stick_x: left.x,
            left_stick_y: left.y,
            right_stick_x: right.x,
            right_stick_y: right.y,
            left_trigger: state.left_trigger,
            right_trigger: state.right_trigger,
        }
    }
}

/// Standard HID Gamepad Report Descriptor.
///
/// This descriptor defines a gamepad with:
/// - 16 buttons
/// - 2 analog sticks (X/Y each, signed 8-bit)
/// - 2 triggers (unsigned 8-bit)
pub const REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Buttons (16 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x10, //   Usage Maximum (Button 16)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x10, //   Report Count (16)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Left Stick ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x15, 0x80, //   Logical Minimum (-128)
    0x25, 0x7F, //   Logical Maximum (127)
    0x95, 0x02, //   Report Count (2)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Right Stick ---
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Triggers ---
    0x09, 0x33, //   Usage (Rx) - Left trigger
    0x09, 0x34, //   Usage (Ry) - Right trigger
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];

/// Gamepad backend: maps the shared inputs through the active controller
/// mode and writes one report per host poll.
pub struct HidGamepadBackend {
    writer: HidWriter<'static, UsbDriver, 8>,
    inputs: &'static SharedInputState,
    mode: ControllerMode,
    calibration: Calibration,
    ready: bool,
}

impl HidGamepadBackend {
    pub fn new(
        writer: HidWriter<'static, UsbDriver, 8>,
        inputs: &'static SharedInputState,
        calibration: Calibration,
    ) -> Self {
        Self {
            writer,
            inputs,
            mode: ControllerMode::new(GameModeId::Melee, SocdPolicy::default(), calibration),
            calibration,
            ready: false,
        }
    }
}

impl CommunicationBackend for HidGamepadBackend {
    fn inputs(&self) -> &SharedInputState {
        self.inputs
    }

    fn set_game_mode(&mut self, mode: &GameModeConfig) {
        self.mode = ControllerMode::new(mode.mode, mode.socd, self.calibration);
    }

    async fn send_report(&mut self) -> Result<(), BackendError> {
        // Never park the dispatcher on an unconfigured endpoint.
        if !self.ready {
            if poll_once(self.writer.ready()).is_pending() {
                return Err(BackendError::NotReady);
            }
            self.ready = true;
        }

        let output = self.mode.map(&self.inputs.snapshot());
        let report = GamepadReport::from(&output);
        self.writer
            .write(&report.as_bytes())
            .await
            .map_err(|e| match e {
                EndpointError::Disabled => {
                    self.ready = false;
                    BackendError::NotReady
                }
                EndpointError::BufferOverflow => BackendError::Io,
            })
    }
}

/// Configure the gamepad HID class in the USB builder.
///
/// Returns the HID writer for use by the application.
pub fn configure_usb_hid(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> HidWriter<'static, UsbDriver, 8> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: embassy_usb::class::hid::HidSubclass::No,
        hid_boot_protocol: embassy_usb::class::hid::HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}

