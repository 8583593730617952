//! Persisted controller configuration and its validation.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::keyboard::{KeyBinding, MAX_KEYS};
use crate::mapping::{Calibration, SocdPolicy};
use crate::mode::{ActivationBinding, GameModeId, HoldPolicy, ModeTarget};
use crate::types::{Button, Buttons};

pub const MAX_GAME_MODES: usize = 8;
pub const MAX_KEYBOARD_MODES: usize = 4;
pub const MAX_BACKENDS: usize = 4;

/// Error type for configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No game mode configured.
    NoGameModes,
    /// Default game mode index is past the end of the list.
    DefaultModeOutOfRange,
    /// An activation combo holds no buttons and would always match.
    EmptyActivation,
    /// No backend selected.
    NoBackends,
    /// The same backend is selected twice.
    DuplicateBackend,
    /// Keymap entry outside the supported HID usage range.
    InvalidKeycode,
    /// Calibration deadzone above [`Calibration::MAX_DEADZONE`].
    DeadzoneTooLarge,
}

/// Transport a backend drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackendKind {
    /// USB HID gamepad.
    HidGamepad,
    /// Raw input stream over UART for overlays.
    InputViewer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GameModeConfig {
    pub mode: GameModeId,
    pub activation: Buttons,
    pub socd: SocdPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardModeConfig {
    pub activation: Buttons,
    pub keymap: Vec<KeyBinding, MAX_KEYS>,
}

/// Validated configuration aggregate.
///
/// Constructed once at boot from flash (or [`Config::default`]) and read-only
/// afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub game_modes: Vec<GameModeConfig, MAX_GAME_MODES>,
    pub keyboard_modes: Vec<KeyboardModeConfig, MAX_KEYBOARD_MODES>,
    /// Index into `game_modes` used at boot and as the no-mode state.
    pub default_game_mode: u8,
    pub backends: Vec<BackendKind, MAX_BACKENDS>,
    pub hold_policy: HoldPolicy,
    pub calibration: Calibration,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_modes.is_empty() {
            return Err(ConfigError::NoGameModes);
        }
        if usize::from(self.default_game_mode) >= self.game_modes.len() {
            return Err(ConfigError::DefaultModeOutOfRange);
        }
        let game = self.game_modes.iter().map(|m| m.activation);
        let keyboard = self.keyboard_modes.iter().map(|m| m.activation);
        if game.chain(keyboard).any(Buttons::is_empty) {
            return Err(ConfigError::EmptyActivation);
        }
        if self.backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        for (i, kind) in self.backends.iter().enumerate() {
            if self.backends[..i].contains(kind) {
                return Err(ConfigError::DuplicateBackend);
            }
        }
        let keys_ok = self
            .keyboard_modes
            .iter()
            .flat_map(|m| m.keymap.iter())
            .all(KeyBinding::is_valid);
        if !keys_ok {
            return Err(ConfigError::InvalidKeycode);
        }
        if self.calibration.deadzone > Calibration::MAX_DEADZONE {
            return Err(ConfigError::DeadzoneTooLarge);
        }
        Ok(())
    }

    /// Game mode used at boot and whenever no mode is selected.
    pub fn default_game(&self) -> Option<&GameModeConfig> {
        self.game_modes.get(usize::from(self.default_game_mode))
    }

    /// Configured backends this build can drive, in config order. Falls
    /// back to the HID gamepad when none of them is available.
    pub fn usable_backends(&self, available: &[BackendKind]) -> Vec<BackendKind, MAX_BACKENDS> {
        let mut usable = Vec::new();
        for kind in self.backends.iter().filter(|k| available.contains(k)) {
            // Same capacity as the config list.
            let _ = usable.push(*kind);
        }
        if usable.is_empty() {
            warn!("no configured backend available, falling back to HID gamepad");
            let _ = usable.push(BackendKind::HidGamepad);
        }
        usable
    }

    /// Activation bindings in declaration order: game modes, then keyboard
    /// modes.
    pub fn activation_bindings(&self) -> impl Iterator<Item = ActivationBinding> + '_ {
        let game = self
            .game_modes
            .iter()
            .enumerate()
            .map(|(i, m)| ActivationBinding::new(m.activation, ModeTarget::Game(i as u8)));
        let keyboard = self
            .keyboard_modes
            .iter()
            .enumerate()
            .map(|(i, m)| ActivationBinding::new(m.activation, ModeTarget::Keyboard(i as u8)));
        game.chain(keyboard)
    }
}

/// Activation prefix shared by every default game mode.
const GAME_PREFIX: [Button; 2] = [Button::MB1, Button::LT1];

const DEFAULT_GAME_MODES: [(GameModeId, Button, SocdPolicy); 5] = [
    (GameModeId::Melee, Button::LF4, SocdPolicy::SecondInputPriority),
    (GameModeId::ProjectM, Button::LF3, SocdPolicy::SecondInputPriority),
    (GameModeId::Ultimate, Button::LF2, SocdPolicy::SecondInputPriority),
    (GameModeId::Fgc, Button::LF1, SocdPolicy::Neutral),
    (GameModeId::Rivals, Button::RF1, SocdPolicy::SecondInputPriority),
];

const DEFAULT_KEYBOARD_ACTIVATION: [Button; 3] = [Button::MB1, Button::LT2, Button::LF4];

/// Home-row style keymap.
const DEFAULT_KEYMAP: [KeyBinding; 11] = [
    KeyBinding::new(Button::LF4, 0x04), // a
    KeyBinding::new(Button::LF3, 0x16), // s
    KeyBinding::new(Button::LF2, 0x07), // d
    KeyBinding::new(Button::LF1, 0x09), // f
    KeyBinding::new(Button::RF1, 0x0D), // j
    KeyBinding::new(Button::RF2, 0x0E), // k
    KeyBinding::new(Button::RF3, 0x0F), // l
    KeyBinding::new(Button::RF4, 0x33), // ;
    KeyBinding::new(Button::RT1, 0x2C), // space
    KeyBinding::new(Button::MB2, 0x28), // enter
    KeyBinding::new(Button::LT1, 0xE1), // left shift
];

impl Default for Config {
    fn default() -> Self {
        let mut game_modes = Vec::new();
        for (mode, button, socd) in DEFAULT_GAME_MODES {
            let activation = Buttons::of(&GAME_PREFIX) | Buttons::from(button);
            let _ = game_modes.push(GameModeConfig {
                mode,
                activation,
                socd,
            });
        }

        let mut keymap = Vec::new();
        for binding in DEFAULT_KEYMAP {
            let _ = keymap.push(binding);
        }
        let mut keyboard_modes = Vec::new();
        let _ = keyboard_modes.push(KeyboardModeConfig {
            activation: Buttons::of(&DEFAULT_KEYBOARD_ACTIVATION),
            keymap,
        });

        let mut backends = Vec::new();
        let _ = backends.push(BackendKind::HidGamepad);

        Self {
            game_modes,
            keyboard_modes,
            default_game_mode: 0,
            backends,
            hold_policy: HoldPolicy::default(),
            calibration: Calibration::default(),
        }
    }
}
