//! UART input-viewer backend.
//!
//! Streams raw input frames to a PC-side viewer. Frames are rate limited so
//! the viewer link never slows the dispatcher down.

use controller_core::viewer::encode_frame;
use controller_core::{BackendError, CommunicationBackend, GameModeConfig, SharedInputState};
use embassy_rp::uart::{Blocking, UartTx};
use embassy_time::{Duration, Instant};

/// Minimum time between two frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(8);

pub struct UartViewerBackend {
    tx: UartTx<'static, Blocking>,
    inputs: &'static SharedInputState,
    next_frame: Instant,
}

impl UartViewerBackend {
    pub fn new(tx: UartTx<'static, Blocking>, inputs: &'static SharedInputState) -> Self {
        Self {
            tx,
            inputs,
            next_frame: Instant::MIN,
        }
    }
}

impl CommunicationBackend for UartViewerBackend {
    fn inputs(&self) -> &SharedInputState {
        self.inputs
    }

    // Raw inputs, no mode mapping.
    fn set_game_mode(&mut self, _mode: &GameModeConfig) {}

    async fn send_report(&mut self) -> Result<(), BackendError> {
        let now = Instant::now();
        if now < self.next_frame {
            return Ok(());
        }
        self.next_frame = now + FRAME_INTERVAL;

        let frame = encode_frame(&self.inputs.snapshot());
        self.tx.blocking_write(&frame).map_err(|_| BackendError::Io)
    }
}
