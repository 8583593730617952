//! Two-context loop discipline: acquisition on one core, dispatch on the other.
//!
//! Startup on the dispatch core:
//!
//! 1. [`safety_check`]: one-shot read of the input sources; if the recovery
//!    button is held, jump to the bootloader before anything else runs.
//! 2. [`start_dispatch`]: status LED, config load (or default + save),
//!    backend construction, activation bindings, then publish the shared
//!    input state to the acquisition core.
//! 3. [`Dispatcher::run`]: select mode, send one report per backend, send
//!    the keyboard report if a keyboard mode is active. Forever.
//!
//! The acquisition core runs [`acquisition_loop`]: it spins until the
//! dispatch core publishes, then polls every source as fast as it can.

use heapless::Vec;

use crate::backend::{BackendError, CommunicationBackend};
use crate::config::{Config, MAX_BACKENDS, MAX_KEYBOARD_MODES};
use crate::input::{acquire, poll_immediate, InputSource};
use crate::keyboard::{KeyReport, KeyboardMode, KeyboardSink};
use crate::mode::{ActiveMode, ModeSelector};
use crate::persistence::{load_or_default, ConfigStore};
use crate::shared::{PublishOnce, SharedInputState};
use crate::types::{Button, InputState};

/// State shared by both execution contexts for the whole run.
pub struct Context {
    inputs: SharedInputState,
    ready: PublishOnce<SharedInputState>,
}

impl Context {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inputs: SharedInputState::new(),
            ready: PublishOnce::new(),
        }
    }

    /// Backends read from here; acquisition writes here once published.
    pub fn inputs(&self) -> &SharedInputState {
        &self.inputs
    }

    /// Whether the dispatch context finished startup.
    pub fn is_ready(&self) -> bool {
        self.ready.is_published()
    }

    fn publish(&'static self) {
        if !self.ready.publish(&self.inputs) {
            warn!("dispatch context published twice");
        }
    }

    /// Spin until the dispatch context publishes, then hand out the state
    /// acquisition writes to.
    pub fn wait_ready(&self) -> &'static SharedInputState {
        self.ready.wait()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Backends built for this run. Sized at startup, never resized.
pub struct Backends<B, K> {
    pub backends: Vec<B, MAX_BACKENDS>,
    pub keyboard: Option<K>,
}

/// Recovery path taken by [`safety_check`].
///
/// Kept apart from [`Platform`] so it can be built before USB or flash.
pub trait Bootloader {
    /// Hand control to the bootloader. Never returns.
    fn enter_bootloader(&mut self) -> !;
}

/// Board services the orchestrator needs.
pub trait Platform {
    type Backend: CommunicationBackend;
    type Keyboard: KeyboardSink;
    type Store: ConfigStore;

    /// Signal that the firmware booted (status LED).
    fn indicate_booted(&mut self);

    fn store(&mut self) -> &mut Self::Store;

    /// Construct the backends `config` selects, each reading from `inputs`.
    fn build_backends(
        &mut self,
        config: &Config,
        inputs: &'static SharedInputState,
    ) -> Backends<Self::Backend, Self::Keyboard>;
}

/// Read every source once, undebounced, and enter the bootloader if
/// `recovery` is held.
///
/// Must run before any other initialisation so the device stays
/// recoverable even when a later step hangs.
pub fn safety_check<S: InputSource, B: Bootloader>(
    sources: &mut [S],
    recovery: Button,
    bootloader: &mut B,
) -> InputState {
    let state = poll_immediate(sources);
    if state.is_pressed(recovery) {
        warn!("recovery button held, entering bootloader");
        bootloader.enter_bootloader();
    }
    state
}

/// One-time dispatch startup. Publishes the shared state last.
pub fn start_dispatch<P: Platform>(
    platform: &mut P,
    ctx: &'static Context,
) -> Dispatcher<P::Backend, P::Keyboard> {
    platform.indicate_booted();

    let config = load_or_default(platform.store());

    let Backends {
        mut backends,
        keyboard,
    } = platform.build_backends(&config, &ctx.inputs);
    info!("{} backends constructed", backends.len());

    if let Some(mode) = config.default_game() {
        for backend in backends.iter_mut() {
            backend.set_game_mode(mode);
        }
    }

    let selector = ModeSelector::new(
        config.activation_bindings(),
        config.hold_policy,
        config.default_game_mode,
    );

    let mut keyboard_modes = Vec::new();
    for mode in &config.keyboard_modes {
        // Same capacity as the config list.
        let _ = keyboard_modes.push(KeyboardMode::new(&mode.keymap));
    }

    ctx.publish();

    Dispatcher {
        inputs: &ctx.inputs,
        config,
        backends,
        keyboard,
        keyboard_modes,
        active_keyboard: None,
        release_keys: false,
        selector,
    }
}

/// Dispatch-side state: owns the config, the backends and the mode handles.
pub struct Dispatcher<B, K> {
    inputs: &'static SharedInputState,
    config: Config,
    backends: Vec<B, MAX_BACKENDS>,
    keyboard: Option<K>,
    keyboard_modes: Vec<KeyboardMode, MAX_KEYBOARD_MODES>,
    /// Index of the active keyboard mode; `None` when no keyboard mode is active.
    active_keyboard: Option<usize>,
    /// Send one empty keyboard report after leaving a keyboard mode.
    release_keys: bool,
    selector: ModeSelector,
}

impl<B: CommunicationBackend, K: KeyboardSink> Dispatcher<B, K> {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backends(&self) -> &[B] {
        &self.backends
    }

    pub fn active_mode(&self) -> ActiveMode {
        self.selector.current()
    }

    /// Run the activation check once and apply a mode change, if any.
    /// Never blocks.
    pub fn select_mode(&mut self) -> ActiveMode {
        let held = self.inputs.held();
        if let Some(next) = self.selector.select(held) {
            match next.keyboard {
                Some(kb) => {
                    self.active_keyboard = Some(usize::from(kb));
                }
                None => {
                    if self.active_keyboard.take().is_some() {
                        self.release_keys = true;
                    }
                    if let Some(mode) = self.config.game_modes.get(usize::from(next.game)) {
                        for backend in self.backends.iter_mut() {
                            backend.set_game_mode(mode);
                        }
                    }
                }
            }
        }
        self.selector.current()
    }

    /// One outer-loop pass.
    pub async fn run_once(&mut self) {
        self.select_mode();

        for backend in self.backends.iter_mut() {
            match backend.send_report().await {
                Ok(()) => {}
                // Host not attached yet; expected until enumeration.
                Err(BackendError::NotReady) => trace!("backend not ready"),
                Err(e) => warn!("backend send failed: {:?}", e),
            }
        }

        let Some(sink) = self.keyboard.as_mut() else {
            return;
        };
        let report = match self.active_keyboard {
            Some(idx) => match self.keyboard_modes.get(idx) {
                Some(mode) => mode.report(&self.inputs.snapshot()),
                None => return,
            },
            None if self.release_keys => KeyReport::default(),
            None => return,
        };
        match sink.send(&report).await {
            Ok(()) => self.release_keys = false,
            Err(BackendError::NotReady) => trace!("keyboard not ready"),
            Err(e) => warn!("keyboard send failed: {:?}", e),
        }
    }

    pub async fn run(&mut self) -> ! {
        loop {
            self.run_once().await;
        }
    }
}

/// Acquisition context body: wait for startup, then poll forever.
pub fn acquisition_loop<S: InputSource>(ctx: &Context, sources: &mut [S]) -> ! {
    let shared = ctx.wait_ready();
    let mut scratch = InputState::neutral();
    loop {
        acquire(sources, &mut scratch, shared);
    }
}
