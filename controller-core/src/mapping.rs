//! Controller modes: map logical buttons to a gamepad report.
//!
//! All game modes share one physical layout:
//!
//! ```text
//! Left stick     LF3 left   LF1 right   LF2 down   RF4 up
//! C-stick        RT3 left   RT5 right   RT2 down   RT4 up
//! A RT1   B RF1   X RF2   Y RF6   Z RF7   L LF4   R RF3
//! Start MB1   Select MB2   Home MB3   LS LT1   RS LT2
//! ```
//!
//! [`GameModeId::Fgc`] routes the directions to the D-pad instead.

use core::ops::{BitOr, BitOrAssign};
use serde::{Deserialize, Serialize};

use crate::mode::GameModeId;
use crate::types::{AnalogStick, Button, InputState};

/// Gamepad button bitfield as reported to the host (16 buttons).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadButtons(pub u16);

impl GamepadButtons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const X: Self = Self(1 << 2);
    pub const Y: Self = Self(1 << 3);
    pub const L: Self = Self(1 << 4);
    pub const R: Self = Self(1 << 5);
    pub const Z: Self = Self(1 << 6);
    pub const SELECT: Self = Self(1 << 7);
    pub const START: Self = Self(1 << 8);
    pub const HOME: Self = Self(1 << 9);
    pub const LS: Self = Self(1 << 10); // Left stick press
    pub const RS: Self = Self(1 << 11); // Right stick press
    pub const DPAD_UP: Self = Self(1 << 12);
    pub const DPAD_DOWN: Self = Self(1 << 13);
    pub const DPAD_LEFT: Self = Self(1 << 14);
    pub const DPAD_RIGHT: Self = Self(1 << 15);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, other: GamepadButtons) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub fn set(&mut self, button: GamepadButtons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl BitOr for GamepadButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for GamepadButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Controller-side output of a mode: what a gamepad backend encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputState {
    pub buttons: GamepadButtons,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub left_trigger: u8,
    pub right_trigger: u8,
}

impl OutputState {
    pub const fn neutral() -> Self {
        Self {
            buttons: GamepadButtons::NONE,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
        }
    }
}

impl Default for OutputState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Stick value re-centered for a HID report: signed, X grows right and
/// Y grows down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidStick {
    pub x: i8,
    pub y: i8,
}

impl From<AnalogStick> for HidStick {
    fn from(stick: AnalogStick) -> Self {
        // Internal Y grows up; HID Y grows down.
        Self {
            x: (i16::from(stick.x) - 128) as i8,
            y: (128 - i16::from(stick.y)).min(127) as i8,
        }
    }
}

/// Resolution of simultaneous opposing cardinal directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocdPolicy {
    /// Both held cancels to neutral.
    Neutral,
    /// The most recently pressed direction wins; releasing it hands back
    /// to the other one.
    #[default]
    SecondInputPriority,
}

/// Auxiliary stick calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub center_x: u8,
    pub center_y: u8,
    /// Offsets from center up to this magnitude read as centered.
    pub deadzone: u8,
}

impl Calibration {
    /// Largest accepted deadzone.
    pub const MAX_DEADZONE: u8 = 64;

    pub fn apply(&self, raw: AnalogStick) -> AnalogStick {
        AnalogStick::new(
            recenter(raw.x, self.center_x, self.deadzone),
            recenter(raw.y, self.center_y, self.deadzone),
        )
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            center_x: AnalogStick::CENTER,
            center_y: AnalogStick::CENTER,
            deadzone: 8,
        }
    }
}

fn recenter(raw: u8, center: u8, deadzone: u8) -> u8 {
    let offset = i16::from(raw) - i16::from(center);
    if offset.unsigned_abs() <= u16::from(deadzone) {
        return AnalogStick::CENTER;
    }
    (i16::from(AnalogStick::CENTER) + offset).clamp(0, 255) as u8
}

/// Resolved direction on one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Negative,
    Neutral,
    Positive,
}

/// Per-axis SOCD tracker.
#[derive(Clone, Copy, Debug, Default)]
struct SocdAxis {
    prev_negative: bool,
    prev_positive: bool,
    /// Direction that wins while both are held.
    winner_positive: bool,
}

impl SocdAxis {
    fn resolve(&mut self, negative: bool, positive: bool, policy: SocdPolicy) -> Axis {
        if negative && !self.prev_negative {
            self.winner_positive = false;
        }
        if positive && !self.prev_positive {
            self.winner_positive = true;
        }
        self.prev_negative = negative;
        self.prev_positive = positive;

        match (negative, positive) {
            (false, false) => Axis::Neutral,
            (true, false) => Axis::Negative,
            (false, true) => Axis::Positive,
            (true, true) => match policy {
                SocdPolicy::Neutral => Axis::Neutral,
                SocdPolicy::SecondInputPriority if self.winner_positive => Axis::Positive,
                SocdPolicy::SecondInputPriority => Axis::Negative,
            },
        }
    }
}

/// Full deflection for Melee-family modes, in stick units from center.
const MELEE_DEFLECTION: u8 = 80;
const FULL_DEFLECTION: u8 = 127;

/// Diagonal scale (x/256), roughly 1/sqrt(2).
const DIAGONAL_SCALE: u16 = 181;

fn stick(x: Axis, y: Axis, deflection: u8) -> AnalogStick {
    let diagonal = x != Axis::Neutral && y != Axis::Neutral;
    let magnitude = if diagonal {
        ((u16::from(deflection) * DIAGONAL_SCALE) >> 8) as u8
    } else {
        deflection
    };
    let axis = |a: Axis| match a {
        Axis::Negative => AnalogStick::CENTER - magnitude,
        Axis::Neutral => AnalogStick::CENTER,
        Axis::Positive => AnalogStick::CENTER + magnitude,
    };
    AnalogStick::new(axis(x), axis(y))
}

/// A game mode: a stateful InputState to OutputState mapping.
pub struct ControllerMode {
    id: GameModeId,
    socd: SocdPolicy,
    calibration: Calibration,
    horizontal: SocdAxis,
    vertical: SocdAxis,
    c_horizontal: SocdAxis,
    c_vertical: SocdAxis,
}

impl ControllerMode {
    pub fn new(id: GameModeId, socd: SocdPolicy, calibration: Calibration) -> Self {
        Self {
            id,
            socd,
            calibration,
            horizontal: SocdAxis::default(),
            vertical: SocdAxis::default(),
            c_horizontal: SocdAxis::default(),
            c_vertical: SocdAxis::default(),
        }
    }

    pub fn id(&self) -> GameModeId {
        self.id
    }

    fn deflection(&self) -> u8 {
        match self.id {
            GameModeId::Melee | GameModeId::ProjectM => MELEE_DEFLECTION,
            GameModeId::Ultimate | GameModeId::Fgc | GameModeId::Rivals => FULL_DEFLECTION,
        }
    }

    /// Map one input snapshot.
    pub fn map(&mut self, input: &InputState) -> OutputState {
        let held = |b: Button| input.is_pressed(b);
        let mut out = OutputState::neutral();

        let buttons = [
            (Button::RT1, GamepadButtons::A),
            (Button::RF1, GamepadButtons::B),
            (Button::RF2, GamepadButtons::X),
            (Button::RF6, GamepadButtons::Y),
            (Button::RF7, GamepadButtons::Z),
            (Button::LF4, GamepadButtons::L),
            (Button::RF3, GamepadButtons::R),
            (Button::MB1, GamepadButtons::START),
            (Button::MB2, GamepadButtons::SELECT),
            (Button::MB3, GamepadButtons::HOME),
            (Button::LT1, GamepadButtons::LS),
            (Button::LT2, GamepadButtons::RS),
        ];
        for (from, to) in buttons {
            out.buttons.set(to, held(from));
        }
        if held(Button::LF4) {
            out.left_trigger = u8::MAX;
        }
        if held(Button::RF3) {
            out.right_trigger = u8::MAX;
        }

        let x = self
            .horizontal
            .resolve(held(Button::LF3), held(Button::LF1), self.socd);
        let y = match self.id {
            GameModeId::Fgc => {
                // Up wins over down regardless of policy.
                let up = held(Button::RF4);
                self.vertical.resolve(held(Button::LF2) && !up, up, self.socd)
            }
            _ => self
                .vertical
                .resolve(held(Button::LF2), held(Button::RF4), self.socd),
        };

        let deflection = self.deflection();
        if self.id == GameModeId::Fgc {
            out.buttons.set(GamepadButtons::DPAD_LEFT, x == Axis::Negative);
            out.buttons.set(GamepadButtons::DPAD_RIGHT, x == Axis::Positive);
            out.buttons.set(GamepadButtons::DPAD_DOWN, y == Axis::Negative);
            out.buttons.set(GamepadButtons::DPAD_UP, y == Axis::Positive);
        } else if x != Axis::Neutral || y != Axis::Neutral {
            out.left_stick = stick(x, y, deflection);
        }

        if input.aux_present && out.left_stick == AnalogStick::NEUTRAL {
            out.left_stick = self.calibration.apply(input.left_stick);
        }

        let cx = self
            .c_horizontal
            .resolve(held(Button::RT3), held(Button::RT5), self.socd);
        let cy = self
            .c_vertical
            .resolve(held(Button::RT2), held(Button::RT4), self.socd);
        out.right_stick = stick(cx, cy, deflection);

        out
    }
}
