//! Input source trait, debounced GPIO buttons, and the acquisition pass.

use embedded_hal::digital::InputPin;

use crate::debounce::{Clock, DebounceConfig, Debouncer};
use crate::shared::SharedInputState;
use crate::types::{Button, InputState};

/// Something that reports logical button (and analog) states.
///
/// Sources never clear what another source reported: several sources may
/// claim the same logical button and the pass result is their logical OR.
/// Implementations must return quickly; they run inside the acquisition
/// loop with no delay between passes.
///
/// Misreads are absorbed by the source (debouncing, re-initialisation) and
/// never surfaced.
pub trait InputSource {
    /// Sample hardware and merge the debounced result into `state`.
    fn update_inputs(&mut self, state: &mut InputState);

    /// Synchronous one-shot read without debouncing.
    ///
    /// Used once at boot, before anything else is initialised. The levels
    /// read here also become the accepted debounced state.
    fn poll_immediate(&mut self, state: &mut InputState) {
        self.update_inputs(state);
    }
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn update_inputs(&mut self, state: &mut InputState) {
        (**self).update_inputs(state);
    }

    fn poll_immediate(&mut self, state: &mut InputState) {
        (**self).poll_immediate(state);
    }
}

/// One button wired directly to a GPIO pin.
pub struct GpioButtonMapping<P> {
    pub button: Button,
    pub pin: P,
}

impl<P> GpioButtonMapping<P> {
    pub const fn new(button: Button, pin: P) -> Self {
        Self { button, pin }
    }
}

struct GpioChannel<P> {
    button: Button,
    pin: P,
    debouncer: Debouncer,
}

/// Directly wired buttons, active-low (pressed pulls the pin to ground).
pub struct DebouncedGpioButtonInput<P, C, const N: usize> {
    channels: [GpioChannel<P>; N],
    clock: C,
    config: DebounceConfig,
}

impl<P: InputPin, C: Clock, const N: usize> DebouncedGpioButtonInput<P, C, N> {
    pub fn new(mappings: [GpioButtonMapping<P>; N], clock: C, config: DebounceConfig) -> Self {
        let channels = mappings.map(|m| GpioChannel {
            button: m.button,
            pin: m.pin,
            debouncer: Debouncer::new(),
        });
        Self {
            channels,
            clock,
            config,
        }
    }

    /// Debounced level of `button`, or `None` if this source does not own it.
    pub fn is_pressed(&self, button: Button) -> Option<bool> {
        self.channels
            .iter()
            .find(|c| c.button == button)
            .map(|c| c.debouncer.is_pressed())
    }
}

impl<P: InputPin, C: Clock, const N: usize> InputSource for DebouncedGpioButtonInput<P, C, N> {
    fn update_inputs(&mut self, state: &mut InputState) {
        let now = self.clock.now_us();
        for ch in &mut self.channels {
            let raw = ch.pin.is_low().ok();
            if ch.debouncer.update(raw, now, self.config) {
                state.press(ch.button);
            }
        }
    }

    fn poll_immediate(&mut self, state: &mut InputState) {
        for ch in &mut self.channels {
            if let Ok(level) = ch.pin.is_low() {
                ch.debouncer.force(level);
            }
            if ch.debouncer.is_pressed() {
                state.press(ch.button);
            }
        }
    }
}

/// Run one acquisition pass.
///
/// Starts from a neutral state (nothing carries over from the previous
/// pass), lets every source merge into it, then publishes the result.
pub fn acquire<S: InputSource>(sources: &mut [S], scratch: &mut InputState, shared: &SharedInputState) {
    *scratch = InputState::neutral();
    for source in sources.iter_mut() {
        source.update_inputs(scratch);
    }
    shared.publish(scratch);
}

/// One-shot undebounced read of every source into a fresh state.
pub fn poll_immediate<S: InputSource>(sources: &mut [S]) -> InputState {
    let mut state = InputState::neutral();
    for source in sources.iter_mut() {
        source.poll_immediate(&mut state);
    }
    state
}


#[cfg(test)]
mod tests {
    use super::mock::{MockClock, MockPin};
    use super::*;
    use crate::types::Buttons;

    fn gpio(
        pins: [(Button, &MockPin); 2],
        clock: &MockClock,
        config: DebounceConfig,
    ) -> DebouncedGpioButtonInput<MockPin, MockClock, 2> {
        DebouncedGpioButtonInput::new(
            pins.map(|(b, p)| GpioButtonMapping::new(b, p.clone())),
            clock.clone(),
            config,
        )
    }

    #[test]
    fn test_gpio_press_after_polls() {
        let a = MockPin::released();
        let b = MockPin::released();
        let clock = MockClock::default();
        let mut input = gpio(
            [(Button::RT1, &a), (Button::RF1, &b)],
            &clock,
            DebounceConfig::Polls(2),
        );

        a.press();
        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(!state.is_pressed(Button::RT1));

        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(state.is_pressed(Button::RT1));
        assert!(!state.is_pressed(Button::RF1));
        assert_eq!(input.is_pressed(Button::RT1), Some(true));
        assert_eq!(input.is_pressed(Button::MB1), None);
    }

    #[test]
    fn test_gpio_window_with_clock() {
        let a = MockPin::released();
        let b = MockPin::released();
        let clock = MockClock::default();
        let mut input = gpio(
            [(Button::RT1, &a), (Button::RF1, &b)],
            &clock,
            DebounceConfig::Window { micros: 500 },
        );

        b.press();
        for _ in 0..5 {
            let mut state = InputState::neutral();
            input.update_inputs(&mut state);
            assert!(!state.is_pressed(Button::RF1));
            clock.advance(100);
        }
        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(state.is_pressed(Button::RF1));
    }

    #[test]
    fn test_gpio_fault_keeps_accepted_state() {
        let a = MockPin::released();
        let b = MockPin::released();
        let clock = MockClock::default();
        let mut input = gpio(
            [(Button::RT1, &a), (Button::RF1, &b)],
            &clock,
            DebounceConfig::Polls(1),
        );

        a.press();
        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(state.is_pressed(Button::RT1));

        a.fault();
        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(state.is_pressed(Button::RT1));
    }

    #[test]
    fn test_poll_immediate_skips_debounce() {
        let a = MockPin::released();
        let b = MockPin::released();
        let clock = MockClock::default();
        let mut input = gpio(
            [(Button::RT2, &a), (Button::RF1, &b)],
            &clock,
            DebounceConfig::Polls(10),
        );

        a.press();
        let mut state = InputState::neutral();
        input.poll_immediate(&mut state);
        assert!(state.is_pressed(Button::RT2));

        // The immediate read seeded the debouncer.
        let mut state = InputState::neutral();
        input.update_inputs(&mut state);
        assert!(state.is_pressed(Button::RT2));
    }

    #[test]
    fn test_acquire_resets_and_publishes() {
        let a = MockPin::released();
        let b = MockPin::released();
        let clock = MockClock::default();
        let mut sources = [gpio(
            [(Button::RT1, &a), (Button::RF1, &b)],
            &clock,
            DebounceConfig::Polls(1),
        )];
        let shared = SharedInputState::new();
        let mut scratch = InputState::neutral();

        a.press();
        acquire(&mut sources, &mut scratch, &shared);
        assert_eq!(shared.held(), Buttons::from(Button::RT1));

        a.release();
        acquire(&mut sources, &mut scratch, &shared);
        assert!(shared.held().is_empty());
    }

    #[test]
    fn test_acquire_merges_overlapping_sources() {
        let a = MockPin::released();
        let b = MockPin::released();
        let c = MockPin::released();
        let d = MockPin::released();
        let clock = MockClock::default();
        // RF1 is claimed by both sources.
        let mut sources = [
            gpio([(Button::RT1, &a), (Button::RF1, &b)], &clock, DebounceConfig::Polls(1)),
            gpio([(Button::MB1, &c), (Button::RF1, &d)], &clock, DebounceConfig::Polls(1)),
        ];
        let shared = SharedInputState::new();
        let mut scratch = InputState::neutral();

        a.press();
        d.press();
        acquire(&mut sources, &mut scratch, &shared);
        assert_eq!(shared.held(), Buttons::of(&[Button::RT1, Button::RF1]));

        acquire(&mut sources, &mut scratch, &shared);
        assert_eq!(shared.held(), Buttons::of(&[Button::RT1, Button::RF1]));
    }
}
