//! Platform-agnostic core of a button-box game controller.
//!
//! This crate holds everything that does not touch a specific chip: input
//! acquisition and debouncing, the lock-free shared input snapshot, mode
//! selection, controller/keyboard mapping, configuration persistence and the
//! two-core orchestration. It can be used both in embedded `no_std`
//! environments and on host for testing.
//!
//! # Overview
//!
//! - [`types`]: Logical buttons and the canonical [`InputState`]
//! - [`shared`]: [`SharedInputState`] and the [`PublishOnce`] startup handshake
//! - [`debounce`], [`input`], [`matrix`], [`nunchuk`]: Input sources
//! - [`mode`]: Activation bindings and the [`ModeSelector`]
//! - [`mapping`], [`keyboard`]: What a game or keyboard mode reports
//! - [`backend`]: Communication backend trait ([`CommunicationBackend`])
//! - [`viewer`]: Input-viewer frame encoding
//! - [`config`], [`persistence`]: [`Config`] and its flash storage
//! - [`orchestrator`]: Safety check, dispatch loop and acquisition loop
//!
//! # Data flow
//!
//! ```text
//! core 1: sources --acquire--> SharedInputState
//! core 0: SharedInputState --select_mode--> backends --send_report--> host
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt instead of the `log` facade
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod backend;
pub mod config;
pub mod debounce;
pub mod input;
pub mod keyboard;
pub mod mapping;
pub mod matrix;
pub mod mode;
pub mod nunchuk;
pub mod orchestrator;
pub mod persistence;
pub mod shared;
pub mod types;
pub mod viewer;

// Re-export main types at crate root
pub use backend::{BackendError, CommunicationBackend};
pub use config::{BackendKind, Config, ConfigError, GameModeConfig, KeyboardModeConfig};
pub use debounce::{Clock, DebounceConfig, Debouncer};
pub use input::{acquire, DebouncedGpioButtonInput, GpioButtonMapping, InputSource};
pub use keyboard::{KeyBinding, KeyReport, KeyboardMode, KeyboardSink};
pub use mapping::{
    Calibration, ControllerMode, GamepadButtons, HidStick, OutputState, SocdPolicy,
};
pub use matrix::{DebouncedSwitchMatrixInput, DiodeDirection, MatrixError, MatrixLayout};
pub use mode::{ActivationBinding, ActiveMode, GameModeId, HoldPolicy, ModeSelector, ModeTarget};
pub use nunchuk::{NunchukError, NunchukInput};
pub use orchestrator::{
    acquisition_loop, safety_check, start_dispatch, Backends, Bootloader, Context, Dispatcher,
    Platform,
};
pub use persistence::{load_or_default, ConfigStore, FlashStore, PersistenceError};
pub use shared::{PublishOnce, SharedInputState};
pub use types::{AnalogStick, Button, Buttons, InputState};
