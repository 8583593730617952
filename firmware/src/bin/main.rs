#![no_std]
#![no_main]

use controller_firmware::board::{self, BoardInput, CONFIG_OFFSET, RECOVERY_BUTTON};
use controller_firmware::{
    acquisition_loop, configure_usb_hid, configure_usb_keyboard, safety_check, start_dispatch,
    Context, RomBootloader, RpPlatform, Transports, UsbDriver,
};
use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Executor;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::hid::State;
use embassy_usb::{Builder, Config as UsbConfig, UsbDevice};
use heapless::Vec;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Shared by both cores for the whole run.
static CONTEXT: Context = Context::new();

static mut CORE1_STACK: Stack<8192> = Stack::new();
static EXECUTOR0: StaticCell<Executor> = StaticCell::new();

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// HID state, one per interface.
static GAMEPAD_STATE: StaticCell<State> = StaticCell::new();
static KEYBOARD_STATE: StaticCell<State> = StaticCell::new();

/// GPIO buttons, matrix and optional Nunchuk.
const MAX_SOURCES: usize = 3;

#[cortex_m_rt::entry]
fn main() -> ! {
    info!("controller firmware starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Input sources ---
    let mut sources: Vec<BoardInput, MAX_SOURCES> = Vec::new();
    let _ = sources.push(BoardInput::Gpio(board::gpio_buttons([
        p.PIN_7.into(),
        p.PIN_8.into(),
        p.PIN_9.into(),
        p.PIN_10.into(),
        p.PIN_11.into(),
        p.PIN_12.into(),
        p.PIN_13.into(),
        p.PIN_14.into(),
        p.PIN_15.into(),
        p.PIN_16.into(),
        p.PIN_17.into(),
        p.PIN_18.into(),
        p.PIN_19.into(),
        p.PIN_20.into(),
        p.PIN_21.into(),
        p.PIN_22.into(),
        p.PIN_26.into(),
    ])));
    match board::switch_matrix(
        [p.PIN_0.into(), p.PIN_1.into(), p.PIN_2.into()],
        [p.PIN_6.into(), p.PIN_5.into(), p.PIN_4.into(), p.PIN_3.into()],
    ) {
        Ok(matrix) => {
            let _ = sources.push(BoardInput::Matrix(matrix));
        }
        Err(e) => error!("switch matrix disabled: {:?}", e),
    }
    #[cfg(feature = "nunchuk")]
    {
        let mut i2c_config = embassy_rp::i2c::Config::default();
        i2c_config.frequency = 400_000;
        let i2c = embassy_rp::i2c::I2c::new_blocking(p.I2C0, p.PIN_29, p.PIN_24, i2c_config);
        let _ = sources.push(BoardInput::Nunchuk(controller_core::NunchukInput::new(
            i2c,
            embassy_time::Delay,
        )));
    }

    // Before USB starts and before flash is touched.
    safety_check(&mut sources[..], RECOVERY_BUTTON, &mut RomBootloader);

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0002); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust Gamepad");
    usb_config.product = Some("Button Box Controller");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );

    let gamepad = configure_usb_hid(&mut builder, GAMEPAD_STATE.init(State::new()));
    let keyboard = configure_usb_keyboard(&mut builder, KEYBOARD_STATE.init(State::new()));
    let usb_device = builder.build();

    #[cfg(feature = "input-viewer")]
    let viewer = {
        let mut uart_config = embassy_rp::uart::Config::default();
        uart_config.baudrate = 115_200;
        embassy_rp::uart::UartTx::new_blocking(p.UART0, p.PIN_28, uart_config)
    };

    let platform = RpPlatform::new(
        Output::new(p.PIN_25, Level::Low),
        Flash::new_blocking(p.FLASH),
        CONFIG_OFFSET,
        Transports {
            gamepad,
            keyboard,
            #[cfg(feature = "input-viewer")]
            viewer,
        },
    );

    // Core 1 spins until core 0 publishes, then polls inputs forever.
    spawn_core1(
        p.CORE1,
        unsafe { &mut *core::ptr::addr_of_mut!(CORE1_STACK) },
        move || acquisition_loop(&CONTEXT, &mut sources[..]),
    );

    let executor0 = EXECUTOR0.init(Executor::new());
    executor0.run(|spawner| {
        spawner.spawn(usb_task(usb_device).unwrap());
        spawner.spawn(dispatch_task(platform).unwrap());
    })
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Dispatch task - loads the config, builds the backends, releases core 1
/// and sends reports forever.
#[embassy_executor::task]
async fn dispatch_task(mut platform: RpPlatform) {
    let mut dispatcher = start_dispatch(&mut platform, &CONTEXT);
    info!("dispatch ready, mode {:?}", dispatcher.active_mode());

    loop {
        dispatcher.run_once().await;
        // Backends that are not due return immediately; let USB run.
        embassy_futures::yield_now().await;
    }
}
