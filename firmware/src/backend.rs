//! The backend set this board can build from a [`BackendKind`](controller_core::BackendKind).

use controller_core::{BackendError, CommunicationBackend, GameModeConfig, SharedInputState};

use crate::usb_output::HidGamepadBackend;
#[cfg(feature = "input-viewer")]
use crate::viewer_output::UartViewerBackend;

pub enum Backend {
    HidGamepad(HidGamepadBackend),
    #[cfg(feature = "input-viewer")]
    InputViewer(UartViewerBackend),
}

impl CommunicationBackend for Backend {
    fn inputs(&self) -> &SharedInputState {
        match self {
            Self::HidGamepad(b) => b.inputs(),
            #[cfg(feature = "input-viewer")]
            Self::InputViewer(b) => b.inputs(),
        }
    }

    fn set_game_mode(&mut self, mode: &GameModeConfig) {
        match self {
            Self::HidGamepad(b) => b.set_game_mode(mode),
            #[cfg(feature = "input-viewer")]
            Self::InputViewer(b) => b.set_game_mode(mode),
        }
    }

    async fn send_report(&mut self) -> Result<(), BackendError> {
        match self {
            Self::HidGamepad(b) => b.send_report().await,
            #[cfg(feature = "input-viewer")]
            Self::InputViewer(b) => b.send_report().await,
        }
    }
}
