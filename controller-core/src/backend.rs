//! Communication backend trait and error types.

use core::future::Future;

use crate::config::GameModeConfig;
use crate::shared::SharedInputState;
use crate::types::InputState;

/// Error type for backend transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BackendError {
    /// USB/UART I/O error.
    Io,
    /// Transport not ready (e.g., USB not enumerated).
    NotReady,
    /// Endpoint busy.
    Busy,
}

/// A protocol encoder bound to the transport it owns.
///
/// The dispatcher calls [`send_report`](Self::send_report) once per pass.
/// Pacing to the host's cadence is the backend's job: it may await the
/// transport, or return early when it is not yet time to send. Errors are
/// not propagated to other backends; the next pass simply tries again.
///
/// # `no_std` Compatibility
///
/// All implementations must be `#![no_std]` compatible with no heap allocation.
pub trait CommunicationBackend {
    /// Read-only view of the shared state this backend reports from.
    fn inputs(&self) -> &SharedInputState;

    /// Latest snapshot of [`inputs`](Self::inputs).
    fn current_inputs(&self) -> InputState {
        self.inputs().snapshot()
    }

    /// Switch the controller mode used to build reports.
    fn set_game_mode(&mut self, mode: &GameModeConfig);

    /// Encode the current inputs and transmit one report.
    fn send_report(&mut self) -> impl Future<Output = Result<(), BackendError>>;
}
