//! Debounced switch matrix scanning.
//!
//! One line at a time is driven low while the orthogonal lines are sampled
//! through pull-ups. Which side drives is fixed by the diode direction, so
//! ghosting is ruled out by wiring rather than detected at runtime.

use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use crate::debounce::{Clock, DebounceConfig, Debouncer};
use crate::input::InputSource;
use crate::types::{Button, InputState};

/// Upper bound on rows or columns in a matrix.
pub const MAX_LINES: usize = 16;

/// Spin iterations between driving a line and sampling.
const SETTLE_SPINS: u32 = 32;

/// Diode orientation, named the way keyboard firmware names it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiodeDirection {
    /// Current flows column to row: rows are driven, columns sensed.
    #[default]
    Col2Row,
    /// Current flows row to column: columns are driven, rows sensed.
    Row2Col,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MatrixError {
    /// Drive/sense line counts do not match the layout for this direction.
    LineCountMismatch,
}

/// `[row][col]` table of logical buttons; `None` marks an unpopulated cell.
pub type MatrixLayout<const ROWS: usize, const COLS: usize> = [[Option<Button>; COLS]; ROWS];

pub struct DebouncedSwitchMatrixInput<O, I, C, const ROWS: usize, const COLS: usize> {
    drive: Vec<O, MAX_LINES>,
    sense: Vec<I, MAX_LINES>,
    layout: MatrixLayout<ROWS, COLS>,
    direction: DiodeDirection,
    cells: [[Debouncer; COLS]; ROWS],
    clock: C,
    config: DebounceConfig,
    /// Every drive line was parked high after the last scan.
    parked: bool,
}

impl<O, I, C, const ROWS: usize, const COLS: usize> DebouncedSwitchMatrixInput<O, I, C, ROWS, COLS>
where
    O: OutputPin,
    I: InputPin,
    C: Clock,
{
    /// Build a matrix scanner.
    ///
    /// With [`DiodeDirection::Col2Row`] `drive` are the row lines and
    /// `sense` the column lines; with [`DiodeDirection::Row2Col`] the roles
    /// swap. Drive lines are parked high.
    pub fn new(
        drive: impl IntoIterator<Item = O>,
        sense: impl IntoIterator<Item = I>,
        layout: MatrixLayout<ROWS, COLS>,
        direction: DiodeDirection,
        clock: C,
        config: DebounceConfig,
    ) -> Result<Self, MatrixError> {
        let (drive_len, sense_len) = match direction {
            DiodeDirection::Col2Row => (ROWS, COLS),
            DiodeDirection::Row2Col => (COLS, ROWS),
        };

        let mut drive_lines = Vec::new();
        for pin in drive {
            drive_lines
                .push(pin)
                .map_err(|_| MatrixError::LineCountMismatch)?;
        }
        let mut sense_lines = Vec::new();
        for pin in sense {
            sense_lines
                .push(pin)
                .map_err(|_| MatrixError::LineCountMismatch)?;
        }
        if drive_lines.len() != drive_len || sense_lines.len() != sense_len {
            return Err(MatrixError::LineCountMismatch);
        }

        let mut parked = true;
        for pin in drive_lines.iter_mut() {
            parked &= pin.set_high().is_ok();
        }

        Ok(Self {
            drive: drive_lines,
            sense: sense_lines,
            layout,
            direction,
            cells: [[Debouncer::new(); COLS]; ROWS],
            clock,
            config,
            parked,
        })
    }

    /// Debounced level of the cell at `row`, `col`.
    pub fn is_cell_pressed(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .is_some_and(Debouncer::is_pressed)
    }

    /// Scan every cell once, handing each cell's debouncer the raw reading
    /// (`None` if the drive or sense line errored).
    ///
    /// A drive line that fails to park high may still sink the sense lines,
    /// so every reading after it is `None` until a scan parks all lines.
    fn scan(&mut self, mut visit: impl FnMut(&mut Debouncer, Option<bool>)) {
        let direction = self.direction;
        let mut clean = self.parked;
        let mut parked = true;
        for (d, drive) in self.drive.iter_mut().enumerate() {
            let driven = clean && drive.set_low().is_ok();
            for _ in 0..SETTLE_SPINS {
                core::hint::spin_loop();
            }
            for (s, sense) in self.sense.iter_mut().enumerate() {
                let raw = if driven { sense.is_low().ok() } else { None };
                let (row, col) = match direction {
                    DiodeDirection::Col2Row => (d, s),
                    DiodeDirection::Row2Col => (s, d),
                };
                visit(&mut self.cells[row][col], raw);
            }
            if drive.set_high().is_err() {
                clean = false;
                parked = false;
            }
        }
        self.parked = parked;
    }

    fn merge(&self, state: &mut InputState) {
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if let Some(button) = self.layout[row][col] {
                    if cell.is_pressed() {
                        state.press(button);
                    }
                }
            }
        }
    }
}

impl<O, I, C, const ROWS: usize, const COLS: usize> InputSource
    for DebouncedSwitchMatrixInput<O, I, C, ROWS, COLS>
where
    O: OutputPin,
    I: InputPin,
    C: Clock,
{
    fn update_inputs(&mut self, state: &mut InputState) {
        let now = self.clock.now_us();
        let config = self.config;
        self.scan(|cell, raw| {
            cell.update(raw, now, config);
        });
        self.merge(state);
    }

    fn poll_immediate(&mut self, state: &mut InputState) {
        self.scan(|cell, raw| {
            if let Some(level) = raw {
                cell.force(level);
            }
        });
        self.merge(state);
    }
}
