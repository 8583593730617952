//! RP2040 services for the orchestrator: LED, flash, bootloader and the
//! transports the backends are built on.

use controller_core::{
    BackendKind, Backends, Bootloader, Config, FlashStore, KeyReport, Platform, SharedInputState,
};
use defmt::{info, warn};
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::FLASH;
use embassy_rp::rom_data::reset_to_usb_boot;
use embassy_usb::class::hid::HidWriter;
use heapless::Vec;

use crate::backend::Backend;
use crate::board::{AVAILABLE_BACKENDS, FLASH_SIZE};
use crate::usb_keyboard::HidKeyboard;
use crate::usb_output::{HidGamepadBackend, UsbDriver};
#[cfg(feature = "input-viewer")]
use crate::viewer_output::UartViewerBackend;

pub type ConfigFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;

/// Transports handed to [`RpPlatform`]. Each is moved into at most one
/// backend.
pub struct Transports {
    pub gamepad: HidWriter<'static, UsbDriver, 8>,
    pub keyboard: HidWriter<'static, UsbDriver, { KeyReport::SIZE }>,
    #[cfg(feature = "input-viewer")]
    pub viewer: embassy_rp::uart::UartTx<'static, embassy_rp::uart::Blocking>,
}

/// USB mass-storage boot from ROM. Needs no peripherals, so the recovery
/// check can run before USB and flash are set up.
pub struct RomBootloader;

impl Bootloader for RomBootloader {
    fn enter_bootloader(&mut self) -> ! {
        reset_to_usb_boot(0, 0);
        loop {
            cortex_m::asm::wfi();
        }
    }
}

pub struct RpPlatform {
    led: Output<'static>,
    store: FlashStore<ConfigFlash>,
    gamepad: Option<HidWriter<'static, UsbDriver, 8>>,
    keyboard: Option<HidWriter<'static, UsbDriver, { KeyReport::SIZE }>>,
    #[cfg(feature = "input-viewer")]
    viewer: Option<embassy_rp::uart::UartTx<'static, embassy_rp::uart::Blocking>>,
}

impl RpPlatform {
    pub fn new(led: Output<'static>, flash: ConfigFlash, offset: u32, transports: Transports) -> Self {
        Self {
            led,
            store: FlashStore::new(flash, offset),
            gamepad: Some(transports.gamepad),
            keyboard: Some(transports.keyboard),
            #[cfg(feature = "input-viewer")]
            viewer: Some(transports.viewer),
        }
    }
}

impl Platform for RpPlatform {
    type Backend = Backend;
    type Keyboard = HidKeyboard;
    type Store = FlashStore<ConfigFlash>;

    fn indicate_booted(&mut self) {
        self.led.set_high();
    }

    fn store(&mut self) -> &mut Self::Store {
        &mut self.store
    }

    fn build_backends(
        &mut self,
        config: &Config,
        inputs: &'static SharedInputState,
    ) -> Backends<Backend, HidKeyboard> {
        let mut backends = Vec::new();
        for kind in config.usable_backends(AVAILABLE_BACKENDS) {
            let backend = match kind {
                BackendKind::HidGamepad => self.gamepad.take().map(|writer| {
                    Backend::HidGamepad(HidGamepadBackend::new(writer, inputs, config.calibration))
                }),
                #[cfg(feature = "input-viewer")]
                BackendKind::InputViewer => self
                    .viewer
                    .take()
                    .map(|tx| Backend::InputViewer(UartViewerBackend::new(tx, inputs))),
                #[cfg(not(feature = "input-viewer"))]
                BackendKind::InputViewer => None,
            };
            match backend {
                // Same capacity as the config list.
                Some(backend) => {
                    let _ = backends.push(backend);
                }
                None => warn!("backend {:?} unavailable, skipped", kind),
            }
        }

        let keyboard = if config.keyboard_modes.is_empty() {
            None
        } else {
            self.keyboard.take().map(HidKeyboard::new)
        };
        info!("keyboard sink: {}", keyboard.is_some());

        Backends { backends, keyboard }
    }
}
