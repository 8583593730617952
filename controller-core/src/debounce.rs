//! Per-channel debounce logic.
//!
//! Each channel tracks a candidate level that differs from the accepted
//! level. The candidate is accepted only after it has been observed
//! consistently for the configured number of polls or elapsed time. Any
//! sample that agrees with the accepted level drops the candidate.

/// Monotonic microsecond clock used by time-window debouncing.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin.
    fn now_us(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Stability requirement for accepting a state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceConfig {
    /// Accept after this many consecutive polls agree on the new level.
    Polls(u16),
    /// Accept once the new level has been stable for this many microseconds.
    Window { micros: u32 },
}

impl DebounceConfig {
    /// 5 ms window, long enough for typical tactile switch bounce.
    pub const DEFAULT: Self = Self::Window { micros: 5_000 };
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Debounce state for one channel (one pin or one matrix cell).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    /// Debounced level: true = pressed.
    accepted: bool,
    /// Consecutive polls that disagreed with `accepted`.
    count: u16,
    /// Timestamp of the first disagreeing poll of the current run.
    since_us: u64,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            accepted: false,
            count: 0,
            since_us: 0,
        }
    }

    /// Feed one raw sample taken at `now_us`.
    ///
    /// `raw` is `None` when the line could not be read; the accepted level
    /// is retained and the candidate run is left untouched.
    ///
    /// Returns the debounced level.
    pub fn update(&mut self, raw: Option<bool>, now_us: u64, config: DebounceConfig) -> bool {
        let Some(level) = raw else {
            return self.accepted;
        };

        if level == self.accepted {
            self.count = 0;
            return self.accepted;
        }

        if self.count == 0 {
            self.since_us = now_us;
        }
        self.count = self.count.saturating_add(1);

        let stable = match config {
            DebounceConfig::Polls(n) => self.count >= n.max(1),
            DebounceConfig::Window { micros } => {
                now_us.saturating_sub(self.since_us) >= u64::from(micros)
            }
        };

        if stable {
            self.accepted = level;
            self.count = 0;
        }

        self.accepted
    }

    /// Accept `level` immediately, discarding any candidate run.
    #[inline]
    pub fn force(&mut self, level: bool) {
        self.accepted = level;
        self.count = 0;
    }

    /// Current debounced level.
    #[inline]
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.accepted
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
