//! Button-box game controller firmware for RP2040.
//!
//! This crate provides the board wiring, the USB and UART backends and the
//! RP2040 [`Platform`](controller_core::Platform) used by the controller
//! core. Core 1 polls the inputs, core 0 runs the dispatcher and USB.

#![no_std]

pub use controller_core::{
    acquisition_loop, safety_check, start_dispatch, Context, Dispatcher, InputSource, InputState,
};

pub mod backend;
pub mod board;
pub mod platform;
pub mod usb_keyboard;
pub mod usb_output;
#[cfg(feature = "input-viewer")]
pub mod viewer_output;

pub use backend::Backend;
pub use board::{BoardInput, EmbassyClock};
pub use platform::{RomBootloader, RpPlatform, Transports};
pub use usb_keyboard::{configure_usb_keyboard, HidKeyboard};
pub use usb_output::{configure_usb_hid, GamepadReport, HidGamepadBackend, UsbDriver};
