//! USB HID boot keyboard, the sink for keyboard modes.

use controller_core::{BackendError, KeyReport, KeyboardSink};
use embassy_futures::poll_once;
use embassy_usb::class::hid::{HidBootProtocol, HidSubclass, HidWriter, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};

use crate::usb_output::UsbDriver;

pub struct HidKeyboard {
    writer: HidWriter<'static, UsbDriver, { KeyReport::SIZE }>,
    ready: bool,
}

impl HidKeyboard {
    pub fn new(writer: HidWriter<'static, UsbDriver, { KeyReport::SIZE }>) -> Self {
        Self {
            writer,
            ready: false,
        }
    }
}

impl KeyboardSink for HidKeyboard {
    async fn send(&mut self, report: &KeyReport) -> Result<(), BackendError> {
        if !self.ready {
            if poll_once(self.writer.ready()).is_pending() {
                return Err(BackendError::NotReady);
            }
            self.ready = true;
        }

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

/// Add a boot-protocol keyboard interface to the USB device.
pub fn configure_usb_keyboard(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> HidWriter<'static, UsbDriver, { KeyReport::SIZE }> {
    let config = embassy_usb::class::hid::Config {
        report_descriptor: KeyboardReport::desc(),
        request_handler: None,
        poll_ms: 1,
        max_packet_size: 8,
        hid_subclass: HidSubclass::Boot,
        hid_boot_protocol: HidBootProtocol::Keyboard,
    };

    HidWriter::new(builder, state, config)
}
