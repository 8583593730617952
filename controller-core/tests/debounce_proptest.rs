//! Property-based tests for debouncing and acquisition merging.

use controller_core::{
    acquire, Button, Buttons, DebounceConfig, Debouncer, InputSource, InputState,
    SharedInputState,
};

/// Source that reports a fixed button set, like a wired button that never changes.
struct Fixed(Buttons);

impl InputSource for Fixed {
    fn update_inputs(&mut self, state: &mut InputState) {
        for b in self.0.iter() {
            state.press(b);
        }
    }
}

fn buttons(mask: u32) -> Buttons {
    Buttons(mask & ((1 << Button::COUNT) - 1))
}

proptest::proptest! {
    /// A flip shorter than the window never changes the debounced level.
    #[test]
    fn short_flip_is_rejected(
        window in 1u32..20_000,
        period in 1u32..2_000,
        frac in 0.0f64..1.0,
        lead in 0u32..50,
    ) {
        let config = DebounceConfig::Window { micros: window };
        let flip_len = ((f64::from(window) * frac) as u64).min(u64::from(window) - 1);
        let mut d = Debouncer::new();
        let mut t = 0u64;

        for _ in 0..lead {
            assert!(!d.update(Some(false), t, config));
            t += u64::from(period);
        }
        let flip_start = t;
        while t <= flip_start + flip_len {
            assert!(!d.update(Some(true), t, config), "accepted at {} (window {})", t - flip_start, window);
            t += u64::from(period);
        }
        for _ in 0..10 {
            assert!(!d.update(Some(false), t, config));
            t += u64::from(period);
        }
    }

    /// A sustained level is accepted at the first sample at or past the
    /// window, never before.
    #[test]
    fn sustained_level_accepted_exactly_at_window(
        window in 1u32..20_000,
        period in 1u32..2_000,
        start in 0u64..1_000_000,
    ) {
        let config = DebounceConfig::Window { micros: window };
        let mut d = Debouncer::new();
        let mut t = start;
        loop {
            let pressed = d.update(Some(true), t, config);
            let elapsed = t - start;
            if elapsed >= u64::from(window) {
                assert!(pressed);
                break;
            }
            assert!(!pressed, "accepted after {} of {}", elapsed, window);
            t += u64::from(period);
        }
    }

    /// Poll counting accepts on the n-th agreeing sample.
    #[test]
    fn polls_accept_on_nth_sample(n in 1u16..64) {
        let config = DebounceConfig::Polls(n);
        let mut d = Debouncer::new();
        for i in 1..=n {
            assert_eq!(d.update(Some(true), 0, config), i == n);
        }
    }

    /// Unreadable samples never change the accepted level.
    #[test]
    fn indeterminate_samples_hold(initial in proptest::bool::ANY, polls in 1u16..16, count in 1usize..100) {
        let config = DebounceConfig::Polls(polls);
        let mut d = Debouncer::new();
        d.force(initial);
        for _ in 0..count {
            assert_eq!(d.update(None, 0, config), initial);
        }
    }

    /// Disjoint sources merge to their union, and repeating a pass with
    /// no hardware change yields the same state.
    #[test]
    fn merge_is_union_and_idempotent(a in proptest::num::u32::ANY, b in proptest::num::u32::ANY) {
        let a = buttons(a);
        let b = Buttons(buttons(b).raw() & !a.raw());
        let mut sources = [Fixed(a), Fixed(b)];
        let shared = SharedInputState::new();
        let mut scratch = InputState::neutral();

        acquire(&mut sources, &mut scratch, &shared);
        let first = shared.snapshot();
        assert_eq!(first.buttons, a | b);

        acquire(&mut sources, &mut scratch, &shared);
        assert_eq!(shared.snapshot(), first);
    }
}
